fn main() {
    // `#[no_mangle]` keeps the GPU hint statics in the image, but link.exe does
    // not put them in the export directory of an EXE on its own. The drivers
    // only look there. Build scripts run on the host, so check the target via
    // Cargo's cfg env vars rather than `#[cfg]`.
    let target_os = std::env::var("CARGO_CFG_TARGET_OS").unwrap_or_default();
    let target_env = std::env::var("CARGO_CFG_TARGET_ENV").unwrap_or_default();

    if target_os == "windows" && target_env == "msvc" {
        for symbol in ["NvOptimusEnablement", "AmdPowerXpressRequestHighPerformance"] {
            println!("cargo:rustc-link-arg-bins=/EXPORT:{symbol},DATA");
        }
    }
}
