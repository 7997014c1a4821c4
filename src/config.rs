//! Launcher settings
//!
//! Read from `launcher.json` next to the executable, or from the file named
//! by `PUNYVERSE_LAUNCHER_CONFIG`. Every field is optional. The entry the
//! launcher hands off to is not configurable.
//!
//! ```json
//! {
//!     "search_paths": ["."],
//!     "log": "punyverse_launcher=debug"
//! }
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

pub const CONFIG_FILE_NAME: &str = "launcher.json";
pub const CONFIG_PATH_ENV: &str = "PUNYVERSE_LAUNCHER_CONFIG";
pub const DEFAULT_LOG_FILTER: &str = "warn";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LauncherConfig {
    /// Directories put in front of the module search path. Relative entries
    /// are taken relative to the executable's directory.
    pub search_paths: Vec<PathBuf>,
    /// env_logger filter used when `RUST_LOG` is unset.
    pub log: String,
}

impl Default for LauncherConfig {
    fn default() -> Self {
        Self {
            search_paths: Vec::new(),
            log: DEFAULT_LOG_FILTER.to_owned(),
        }
    }
}

impl LauncherConfig {
    /// Config file location for an executable at `exe`.
    pub fn path_for(exe: &Path) -> PathBuf {
        match std::env::var_os(CONFIG_PATH_ENV) {
            Some(path) if !path.is_empty() => PathBuf::from(path),
            _ => exe_dir(exe).join(CONFIG_FILE_NAME),
        }
    }

    /// Loads the config for `exe`. A missing file gives the defaults.
    pub fn locate(exe: &Path) -> Result<Self> {
        Self::load(&Self::path_for(exe))
    }

    /// Like [`locate`](Self::locate), but an unreadable or invalid file also
    /// gives the defaults. The error comes back so it can be logged once
    /// logging is up.
    pub fn locate_or_default(exe: &Path) -> (Self, Option<anyhow::Error>) {
        match Self::locate(exe) {
            Ok(config) => (config, None),
            Err(e) => (Self::default(), Some(e)),
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(e).with_context(|| format!("failed to read {}", path.display())),
        };
        serde_json::from_str(&text).with_context(|| format!("invalid launcher config {}", path.display()))
    }

    /// `search_paths` with relative entries anchored at the executable's directory.
    pub fn resolved_search_paths(&self, exe: &Path) -> Vec<PathBuf> {
        let base = exe_dir(exe);
        self.search_paths
            .iter()
            .map(|dir| if dir.is_absolute() { dir.clone() } else { base.join(dir) })
            .collect()
    }
}

fn exe_dir(exe: &Path) -> PathBuf {
    match exe.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
