//! Punyverse Console Entry Point
//!
//! Console-subsystem launcher. `punyversew` is the windowed twin; both run
//! the same bootstrap through lib.rs.

#![windows_subsystem = "console"]

fn main() {
    let code = punyverse_launcher::run(punyverse_launcher::Subsystem::Console);
    std::process::exit(code);
}
