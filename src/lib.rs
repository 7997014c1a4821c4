//! Punyverse Launcher
//!
//! Native start-up for the Punyverse simulator, which is written in Python.
//! The binaries declare the high-performance GPU to hybrid-graphics drivers,
//! host a CPython interpreter, give it this process's command line and hand
//! control to `punyverse.main:main`.

pub mod args;
pub mod bootstrap;
pub mod config;
pub mod gpu;
pub mod install;
pub mod logging;
pub mod python;
pub mod runtime;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::args::{ArgumentSource, DefaultArgs, ProcessArgs};
use crate::bootstrap::Bootstrap;
use crate::config::LauncherConfig;
use crate::python::CPython;
use crate::runtime::{EmbeddedRuntime, EntryPoint};

/// Which kind of process entry this build is. Only affects where logs go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subsystem {
    Console,
    Windowed,
}

/// Launcher entry - called from both launcher binaries
///
/// Returns the process exit status. Failures before the interpreter starts
/// are logged and reported with status 1.
pub fn run(subsystem: Subsystem) -> i32 {
    run_with(subsystem, CPython::new)
}

/// [`run`] with the embedded runtime supplied by `make_runtime`.
pub fn run_with<R, F>(subsystem: Subsystem, make_runtime: F) -> i32
where
    R: EmbeddedRuntime,
    F: FnOnce() -> Result<R>,
{
    let args = DefaultArgs::default().acquire();
    let exe = std::env::current_exe()
        .ok()
        .or_else(|| args.as_ref().ok().map(|a| PathBuf::from(a.program())))
        .unwrap_or_else(|| PathBuf::from("punyverse"));

    let (config, config_err) = LauncherConfig::locate_or_default(&exe);
    logging::init(subsystem, &config.log, &exe);
    if let Some(e) = config_err {
        log::warn!("Ignoring launcher config: {:#}", e);
    }

    log::info!(
        "Punyverse launcher ({:?}) starting on {} {}",
        subsystem,
        std::env::consts::OS,
        std::env::consts::ARCH
    );
    log::debug!("GPU hints: {:?}", gpu::declared_hints());

    match args.and_then(|args| launch(&args, &config, &exe, make_runtime)) {
        Ok(code) => code,
        Err(e) => {
            log::error!("{:#}", e);
            if subsystem == Subsystem::Console {
                eprintln!("punyverse: {:#}", e);
            }
            1
        }
    }
}

fn launch<R: EmbeddedRuntime>(
    args: &ProcessArgs,
    config: &LauncherConfig,
    exe: &Path,
    make_runtime: impl FnOnce() -> Result<R>,
) -> Result<i32> {
    log::debug!("Acquired {} argument(s) as {:?} text", args.argc(), DefaultArgs::WIDTH);
    let runtime = make_runtime()?;
    let mut bootstrap =
        Bootstrap::new(runtime, EntryPoint::PUNYVERSE).with_search_paths(config.resolved_search_paths(exe));
    bootstrap.run(args).context("launch failed")
}
