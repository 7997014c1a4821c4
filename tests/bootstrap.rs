use std::ffi::{OsStr, OsString};
use std::path::PathBuf;

use anyhow::{bail, Result};
use punyverse_launcher::args::ProcessArgs;
use punyverse_launcher::bootstrap::{Bootstrap, LaunchState};
use punyverse_launcher::runtime::{EmbeddedRuntime, EntryPoint, EntryStatus};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Call {
    ProgramName(OsString),
    Initialize,
    Argv(Vec<OsString>, bool),
    SearchPath(Vec<PathBuf>),
    Entry(String),
    Finalize,
}

/// Records every call and plays back a scripted outcome.
#[derive(Default)]
struct Recorder {
    calls: Vec<Call>,
    live: bool,
    fail_initialize: bool,
    fail_argv: bool,
    fail_finalize: bool,
    status: Option<EntryStatus>,
    // argv as the "application" saw it when its entry ran
    seen_by_entry: Option<Vec<OsString>>,
    argv: Vec<OsString>,
}

impl EmbeddedRuntime for Recorder {
    fn set_program_name(&mut self, program: &OsStr) -> Result<()> {
        self.calls.push(Call::ProgramName(program.to_owned()));
        Ok(())
    }

    fn initialize(&mut self) -> Result<()> {
        self.calls.push(Call::Initialize);
        if self.fail_initialize {
            bail!("no stdlib");
        }
        self.live = true;
        Ok(())
    }

    fn set_argv(&mut self, args: &ProcessArgs, update_path: bool) -> Result<()> {
        assert!(self.live, "argv installed before initialize");
        self.calls.push(Call::Argv(args.argv().to_vec(), update_path));
        if self.fail_argv {
            bail!("sys is gone");
        }
        self.argv = args.argv().to_vec();
        Ok(())
    }

    fn extend_search_path(&mut self, dirs: &[PathBuf]) -> Result<()> {
        self.calls.push(Call::SearchPath(dirs.to_vec()));
        Ok(())
    }

    fn run_entry(&mut self, entry: &EntryPoint) -> EntryStatus {
        assert!(self.live, "entry invoked outside a live runtime");
        self.calls.push(Call::Entry(entry.to_string()));
        self.seen_by_entry = Some(self.argv.clone());
        self.status.unwrap_or(EntryStatus::Returned)
    }

    fn finalize(&mut self) -> Result<()> {
        assert!(self.live, "finalized twice or never initialized");
        self.live = false;
        self.argv.clear();
        self.calls.push(Call::Finalize);
        if self.fail_finalize {
            bail!("buffers would not flush");
        }
        Ok(())
    }
}

fn args(tokens: &[&str]) -> ProcessArgs {
    ProcessArgs::new(tokens.iter().copied()).unwrap()
}

fn os(tokens: &[&str]) -> Vec<OsString> {
    tokens.iter().map(OsString::from).collect()
}

#[test]
fn lifecycle_runs_in_order() {
    let mut bootstrap = Bootstrap::new(Recorder::default(), EntryPoint::PUNYVERSE);
    let code = bootstrap.run(&args(&["punyverse.exe", "a", "b c", "d"])).unwrap();

    assert_eq!(code, 0);
    assert_eq!(bootstrap.state(), LaunchState::ProcessExited);
    assert_eq!(
        bootstrap.into_runtime().calls,
        vec![
            Call::ProgramName("punyverse.exe".into()),
            Call::Initialize,
            Call::Argv(os(&["punyverse.exe", "a", "b c", "d"]), false),
            Call::Entry("punyverse.main:main".into()),
            Call::Finalize,
        ]
    );
}

#[test]
fn entry_sees_the_arguments_unchanged() {
    let mut bootstrap = Bootstrap::new(Recorder::default(), EntryPoint::PUNYVERSE);
    bootstrap.run(&args(&["C:\\Scripts\\punyverse.exe", "-m", "4", "--normal"])).unwrap();

    let seen = bootstrap.into_runtime().seen_by_entry.unwrap();
    assert_eq!(seen, os(&["C:\\Scripts\\punyverse.exe", "-m", "4", "--normal"]));
}

#[test]
fn program_name_alone_is_argc_one() {
    let mut bootstrap = Bootstrap::new(Recorder::default(), EntryPoint::PUNYVERSE);
    bootstrap.run(&args(&["punyverse"])).unwrap();

    let seen = bootstrap.into_runtime().seen_by_entry.unwrap();
    assert_eq!(seen, os(&["punyverse"]));
}

#[test]
fn search_paths_go_in_before_the_entry() {
    let dirs = vec![PathBuf::from("/opt/punyverse")];
    let mut bootstrap = Bootstrap::new(Recorder::default(), EntryPoint::PUNYVERSE).with_search_paths(dirs.clone());
    bootstrap.run(&args(&["punyverse"])).unwrap();

    let calls = bootstrap.into_runtime().calls;
    assert_eq!(calls[3], Call::SearchPath(dirs));
    assert_eq!(calls[4], Call::Entry("punyverse.main:main".into()));
}

#[test]
fn entry_status_is_passed_through() {
    for (status, code) in [
        (EntryStatus::Raised, 0),
        (EntryStatus::Exited(2), 2),
        (EntryStatus::Exited(0), 0),
    ] {
        let runtime = Recorder {
            status: Some(status),
            ..Recorder::default()
        };
        let mut bootstrap = Bootstrap::new(runtime, EntryPoint::PUNYVERSE);
        assert_eq!(bootstrap.run(&args(&["punyverse"])).unwrap(), code);
        assert_eq!(bootstrap.into_runtime().calls.last(), Some(&Call::Finalize));
    }
}

#[test]
fn failed_initialize_skips_everything_else() {
    let runtime = Recorder {
        fail_initialize: true,
        ..Recorder::default()
    };
    let mut bootstrap = Bootstrap::new(runtime, EntryPoint::PUNYVERSE);
    let err = bootstrap.run(&args(&["punyverse"])).unwrap_err();

    assert!(format!("{:#}", err).contains("no stdlib"));
    assert_eq!(bootstrap.state(), LaunchState::NotStarted);
    assert_eq!(
        bootstrap.into_runtime().calls,
        vec![Call::ProgramName("punyverse".into()), Call::Initialize]
    );
}

#[test]
fn failure_after_initialize_still_finalizes() {
    let runtime = Recorder {
        fail_argv: true,
        ..Recorder::default()
    };
    let mut bootstrap = Bootstrap::new(runtime, EntryPoint::PUNYVERSE);
    assert!(bootstrap.run(&args(&["punyverse", "x"])).is_err());
    assert_eq!(bootstrap.state(), LaunchState::RuntimeFinalized);

    let calls = bootstrap.into_runtime().calls;
    assert!(!calls.iter().any(|c| matches!(c, Call::Entry(_))));
    assert_eq!(calls.last(), Some(&Call::Finalize));
    assert_eq!(calls.iter().filter(|c| **c == Call::Finalize).count(), 1);
}

#[test]
fn finalize_failure_does_not_change_the_status() {
    let runtime = Recorder {
        fail_finalize: true,
        status: Some(EntryStatus::Exited(3)),
        ..Recorder::default()
    };
    let mut bootstrap = Bootstrap::new(runtime, EntryPoint::PUNYVERSE);
    assert_eq!(bootstrap.run(&args(&["punyverse"])).unwrap(), 3);
    assert_eq!(bootstrap.state(), LaunchState::ProcessExited);
}

#[test]
fn a_bootstrap_runs_once() {
    let mut bootstrap = Bootstrap::new(Recorder::default(), EntryPoint::PUNYVERSE);
    bootstrap.run(&args(&["punyverse"])).unwrap();

    let err = bootstrap.run(&args(&["punyverse"])).unwrap_err();
    assert!(err.to_string().contains("already ran"));
    assert_eq!(bootstrap.into_runtime().calls.len(), 5);
}

#[test]
fn separate_bootstraps_are_isolated() {
    let mut first = Bootstrap::new(Recorder::default(), EntryPoint::PUNYVERSE);
    first.run(&args(&["punyverse", "--debug"])).unwrap();
    let first = first.into_runtime();

    let mut second = Bootstrap::new(first, "punyverse.small_images:main".parse().unwrap());
    second.run(&args(&["punyverse"])).unwrap();
    let runtime = second.into_runtime();

    assert_eq!(runtime.seen_by_entry, Some(os(&["punyverse"])));
    assert_eq!(runtime.calls.len(), 10);
    assert_eq!(runtime.calls[9], Call::Finalize);
    assert!(!runtime.live);
}
