//! Embedded runtime contract
//!
//! The bootstrap only talks to the interpreter through [`EmbeddedRuntime`].
//! The application is reached through a typed [`EntryPoint`] instead of a
//! source string, so a malformed target is caught when the entry is built,
//! not when the interpreter evaluates it.

use std::borrow::Cow;
use std::ffi::OsStr;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{bail, Result};

use crate::args::ProcessArgs;

/// A zero-argument function inside a module of the embedded application,
/// written `module:function` like a Python `entry_points` target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryPoint {
    module: Cow<'static, str>,
    function: Cow<'static, str>,
}

impl EntryPoint {
    /// The simulator's documented entry.
    pub const PUNYVERSE: EntryPoint = EntryPoint {
        module: Cow::Borrowed("punyverse.main"),
        function: Cow::Borrowed("main"),
    };

    pub fn new(module: impl Into<String>, function: impl Into<String>) -> Result<Self> {
        let module = module.into();
        let function = function.into();
        if module.is_empty() || !module.split('.').all(is_identifier) {
            bail!("invalid module path {module:?} in entry point");
        }
        if !is_identifier(&function) {
            bail!("invalid function name {function:?} in entry point");
        }
        Ok(Self {
            module: Cow::Owned(module),
            function: Cow::Owned(function),
        })
    }

    pub fn module(&self) -> &str {
        &self.module
    }

    pub fn function(&self) -> &str {
        &self.function
    }
}

impl fmt::Display for EntryPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.module, self.function)
    }
}

impl FromStr for EntryPoint {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.split_once(':') {
            Some((module, function)) => Self::new(module.trim(), function.trim()),
            None => bail!("entry point {s:?} is not of the form module:function"),
        }
    }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c == '_' || c.is_alphabetic() => chars.all(|c| c == '_' || c.is_alphanumeric()),
        _ => false,
    }
}

/// How the entry invocation ended, as reported by the runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryStatus {
    /// The entry function returned normally.
    Returned,
    /// An uncaught error escaped the entry; the runtime already printed it.
    /// The launcher does not turn this into a failure status.
    Raised,
    /// The application asked the runtime to exit with this status.
    Exited(i32),
}

impl EntryStatus {
    pub fn code(self) -> i32 {
        match self {
            EntryStatus::Returned => 0,
            EntryStatus::Raised => 0,
            EntryStatus::Exited(code) => code,
        }
    }
}

/// An interpreter hosted inside this process.
///
/// Calls arrive in a fixed order: `set_program_name`, `initialize`,
/// `set_argv`, `extend_search_path`, `run_entry`, `finalize`. `finalize` is
/// called exactly once for every successful `initialize`.
pub trait EmbeddedRuntime {
    /// Tells the runtime where it was started from, before it initializes.
    fn set_program_name(&mut self, program: &OsStr) -> Result<()>;

    fn initialize(&mut self) -> Result<()>;

    /// Installs `args` as the runtime's argument list. With `update_path` the
    /// runtime also applies its own script-directory discovery.
    fn set_argv(&mut self, args: &ProcessArgs, update_path: bool) -> Result<()>;

    /// Puts `dirs` at the front of the module search path.
    fn extend_search_path(&mut self, dirs: &[PathBuf]) -> Result<()>;

    fn run_entry(&mut self, entry: &EntryPoint) -> EntryStatus;

    fn finalize(&mut self) -> Result<()>;
}

/// An initialized runtime. Finalizes on [`finish`](Self::finish), or on drop
/// if `finish` was never reached.
pub struct RuntimeSession<'a, R: EmbeddedRuntime> {
    runtime: &'a mut R,
    finalized: bool,
}

impl<'a, R: EmbeddedRuntime> RuntimeSession<'a, R> {
    pub fn start(runtime: &'a mut R) -> Result<Self> {
        runtime.initialize()?;
        Ok(Self {
            runtime,
            finalized: false,
        })
    }

    pub fn runtime(&mut self) -> &mut R {
        &mut *self.runtime
    }

    pub fn finish(mut self) -> Result<()> {
        self.finalized = true;
        self.runtime.finalize()
    }
}

impl<R: EmbeddedRuntime> Drop for RuntimeSession<'_, R> {
    fn drop(&mut self) {
        if self.finalized {
            return;
        }
        self.finalized = true;
        if let Err(e) = self.runtime.finalize() {
            log::error!("Runtime finalization failed: {:#}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_entry_points_form() {
        let entry: EntryPoint = "punyverse.main:main".parse().unwrap();
        assert_eq!(entry, EntryPoint::PUNYVERSE);
        assert_eq!(entry.module(), "punyverse.main");
        assert_eq!(entry.function(), "main");
        assert_eq!(entry.to_string(), "punyverse.main:main");
    }

    #[test]
    fn tolerates_spaces_around_colon() {
        let entry: EntryPoint = "punyverse.small_images : main".parse().unwrap();
        assert_eq!(entry.module(), "punyverse.small_images");
    }

    #[test]
    fn rejects_malformed_targets() {
        for bad in ["punyverse.main", ":main", "punyverse.:main", "punyverse.main:", "a b:main", "pkg:main()", "1pkg:main"] {
            assert!(bad.parse::<EntryPoint>().is_err(), "{bad} should not parse");
        }
    }

    #[test]
    fn status_codes_pass_through() {
        assert_eq!(EntryStatus::Returned.code(), 0);
        assert_eq!(EntryStatus::Raised.code(), 0);
        assert_eq!(EntryStatus::Exited(2).code(), 2);
        assert_eq!(EntryStatus::Exited(0).code(), 0);
    }
}
