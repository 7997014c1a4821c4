//! One pass from process arguments to the application and back.

use std::fmt;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use crate::args::ProcessArgs;
use crate::runtime::{EmbeddedRuntime, EntryPoint, EntryStatus, RuntimeSession};

/// Where a [`Bootstrap`] is in its single, forward-only lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LaunchState {
    NotStarted,
    RuntimeInitialized,
    EntryInvoked,
    RuntimeFinalized,
    ProcessExited,
}

impl fmt::Display for LaunchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LaunchState::NotStarted => "not started",
            LaunchState::RuntimeInitialized => "runtime initialized",
            LaunchState::EntryInvoked => "entry invoked",
            LaunchState::RuntimeFinalized => "runtime finalized",
            LaunchState::ProcessExited => "process exited",
        };
        f.write_str(name)
    }
}

/// Drives an [`EmbeddedRuntime`] through start, hand-off and shutdown.
pub struct Bootstrap<R: EmbeddedRuntime> {
    runtime: R,
    entry: EntryPoint,
    search_paths: Vec<PathBuf>,
    state: LaunchState,
}

impl<R: EmbeddedRuntime> Bootstrap<R> {
    pub fn new(runtime: R, entry: EntryPoint) -> Self {
        Self {
            runtime,
            entry,
            search_paths: Vec::new(),
            state: LaunchState::NotStarted,
        }
    }

    pub fn with_search_paths(mut self, paths: Vec<PathBuf>) -> Self {
        self.search_paths = paths;
        self
    }

    pub fn state(&self) -> LaunchState {
        self.state
    }

    pub fn into_runtime(self) -> R {
        self.runtime
    }

    /// Hands `args` to the runtime, runs the entry and shuts the runtime down.
    ///
    /// Returns the exit status the runtime reported for the entry. Once the
    /// runtime has initialized it is finalized on every path out of here.
    pub fn run(&mut self, args: &ProcessArgs) -> Result<i32> {
        if self.state != LaunchState::NotStarted {
            bail!("bootstrap already ran (state: {})", self.state);
        }

        self.runtime
            .set_program_name(args.program())
            .context("failed to set program name")?;

        let mut session = RuntimeSession::start(&mut self.runtime).context("failed to initialize runtime")?;
        advance(&mut self.state, LaunchState::RuntimeInitialized);

        let handed_off = hand_off(session.runtime(), args, &self.search_paths, &self.entry);
        if handed_off.is_ok() {
            advance(&mut self.state, LaunchState::EntryInvoked);
        }

        let finished = session.finish();
        advance(&mut self.state, LaunchState::RuntimeFinalized);
        if let Err(e) = finished {
            log::error!("Runtime finalization failed: {:#}", e);
        }

        let status = handed_off?;
        advance(&mut self.state, LaunchState::ProcessExited);
        Ok(status.code())
    }
}

fn hand_off<R: EmbeddedRuntime>(
    runtime: &mut R,
    args: &ProcessArgs,
    search_paths: &[PathBuf],
    entry: &EntryPoint,
) -> Result<EntryStatus> {
    // The program already supplied its own path as token 0.
    runtime
        .set_argv(args, false)
        .context("failed to install process arguments")?;
    if !search_paths.is_empty() {
        runtime
            .extend_search_path(search_paths)
            .context("failed to extend module search path")?;
    }

    log::info!("Handing off to {} with {} argument(s)", entry, args.argc());
    let status = runtime.run_entry(entry);
    log::debug!("Entry {} ended with {:?}", entry, status);
    Ok(status)
}

fn advance(state: &mut LaunchState, next: LaunchState) {
    debug_assert!(next > *state, "launch state went backwards: {} -> {}", state, next);
    log::debug!("Launch state: {} -> {}", state, next);
    *state = next;
}
