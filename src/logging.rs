//! env_logger setup for both subsystems
//!
//! A windowed process starts without standard streams, so its log goes to
//! `<exe>.log` beside the executable instead. The file is only created once
//! something is actually logged.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::Subsystem;

/// Installs the global logger. `RUST_LOG` wins over `filter`.
pub fn init(subsystem: Subsystem, filter: &str, exe: &Path) {
    let mut builder = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter));
    if subsystem == Subsystem::Windowed {
        builder
            .target(env_logger::Target::Pipe(Box::new(LazyLogFile::new(log_file_for(exe)))))
            .write_style(env_logger::WriteStyle::Never);
    }
    // A logger installed by the host (tests, mostly) stays in place.
    let _ = builder.try_init();
}

/// `punyversew.exe` logs to `punyversew.exe.log`.
pub fn log_file_for(exe: &Path) -> PathBuf {
    let mut name = exe.file_name().map(|n| n.to_os_string()).unwrap_or_else(|| "punyverse".into());
    name.push(".log");
    exe.with_file_name(name)
}

/// Append-mode file opened on first write.
pub struct LazyLogFile {
    path: PathBuf,
    file: Option<File>,
}

impl LazyLogFile {
    pub fn new(path: PathBuf) -> Self {
        Self { path, file: None }
    }
}

impl Write for LazyLogFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        let file = match self.file.take() {
            Some(file) => file,
            None => OpenOptions::new().create(true).append(true).open(&self.path)?,
        };
        self.file.insert(file).write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        match &mut self.file {
            Some(file) => file.flush(),
            None => Ok(()),
        }
    }
}
