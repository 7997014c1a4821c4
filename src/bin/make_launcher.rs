//! Installs the launchers over the script wrappers in a Python `Scripts`
//! directory.
//!
//! Usage: `punyverse-make-launcher [SCRIPTS_DIR]`. Without an argument the
//! active virtualenv's `Scripts` is used, then `Scripts` under the prefix of
//! the `python` on `PATH` (or `$PYTHON`).

use std::path::PathBuf;

use anyhow::{Context, Result};
use punyverse_launcher::install;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if !cfg!(windows) {
        println!("Not on Windows. Nothing to do.");
        return;
    }

    if let Err(e) = make_launcher() {
        log::error!("{:#}", e);
        std::process::exit(1);
    }
}

fn make_launcher() -> Result<()> {
    let exe = std::env::current_exe().context("cannot locate this executable")?;
    let source_dir = exe.parent().map(PathBuf::from).unwrap_or_default();
    let scripts_dir = match std::env::args_os().nth(1) {
        Some(dir) => PathBuf::from(dir),
        None => install::default_scripts_dir().context("cannot find the Python Scripts directory")?,
    };

    for copied in install::install_launchers(&source_dir, &scripts_dir)? {
        println!("Copied {} to {}", copied.from.display(), copied.to.display());
    }
    Ok(())
}
