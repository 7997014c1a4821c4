//! Punyverse Windowed Entry Point
//!
//! Same launcher as `punyverse`, built for the windowed subsystem so no
//! console is attached. The arguments still come from the OS command line.

#![windows_subsystem = "windows"]

fn main() {
    let code = punyverse_launcher::run(punyverse_launcher::Subsystem::Windowed);
    std::process::exit(code);
}
