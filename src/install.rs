//! Swaps the launchers in for setuptools' script wrappers.
//!
//! Installing the package leaves generic `punyverse(.exe)` and
//! `punyversew(.exe)` wrappers in the Python `Scripts` directory. Copying the
//! launchers over them gives the installed commands the GPU hints and the
//! embedded-interpreter start.

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{bail, Context, Result};

/// Launchers and the same-named script wrappers they replace.
pub const LAUNCHERS: [&str; 2] = ["punyverse", "punyversew"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Copied {
    pub from: PathBuf,
    pub to: PathBuf,
}

pub fn executable_name(stem: &str) -> String {
    format!("{stem}{}", std::env::consts::EXE_SUFFIX)
}

/// Copies each launcher in `source_dir` over its wrapper in `scripts_dir`.
///
/// Every file has to exist up front; nothing is copied otherwise.
pub fn install_launchers(source_dir: &Path, scripts_dir: &Path) -> Result<Vec<Copied>> {
    let plan: Vec<Copied> = LAUNCHERS
        .iter()
        .map(|name| Copied {
            from: source_dir.join(executable_name(name)),
            to: scripts_dir.join(executable_name(name)),
        })
        .collect();

    if source_dir == scripts_dir {
        bail!("launchers are already in {}", scripts_dir.display());
    }
    for file in plan.iter().flat_map(|c| [&c.from, &c.to]) {
        if !file.is_file() {
            bail!("{} does not exist", file.display());
        }
    }

    for copy in &plan {
        log::info!("Copying {} to {}...", copy.from.display(), copy.to.display());
        std::fs::copy(&copy.from, &copy.to)
            .with_context(|| format!("failed to copy {} to {}", copy.from.display(), copy.to.display()))?;
    }
    Ok(plan)
}

/// Interpreter asked for its prefix when no virtualenv is active. `PYTHON`
/// overrides it.
pub fn default_python() -> OsString {
    match std::env::var_os("PYTHON") {
        Some(python) if !python.is_empty() => python,
        _ if cfg!(windows) => OsString::from("python"),
        _ => OsString::from("python3"),
    }
}

/// `Scripts` directory the package's wrappers were installed into: the
/// active virtualenv's, otherwise the one under the interpreter's prefix.
pub fn default_scripts_dir() -> Result<PathBuf> {
    scripts_dir_for(std::env::var_os("VIRTUAL_ENV"), || python_prefix(&default_python()))
}

pub fn scripts_dir_for(venv: Option<OsString>, prefix: impl FnOnce() -> Result<PathBuf>) -> Result<PathBuf> {
    match venv {
        Some(venv) if !venv.is_empty() => Ok(PathBuf::from(venv).join("Scripts")),
        _ => Ok(prefix()?.join("Scripts")),
    }
}

/// `sys.prefix` as reported by running `python`.
pub fn python_prefix(python: &OsStr) -> Result<PathBuf> {
    let output = Command::new(python)
        .args(["-c", "import sys; print(sys.prefix)"])
        .output()
        .with_context(|| format!("failed to run {}", Path::new(python).display()))?;
    if !output.status.success() {
        bail!(
            "{} exited with {}: {}",
            Path::new(python).display(),
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }
    let prefix = String::from_utf8(output.stdout).context("sys.prefix is not valid UTF-8")?;
    let prefix = prefix.trim();
    if prefix.is_empty() {
        bail!("{} reported an empty sys.prefix", Path::new(python).display());
    }
    Ok(PathBuf::from(prefix))
}
