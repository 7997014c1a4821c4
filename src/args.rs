//! Process argument acquisition
//!
//! The embedded interpreter decides how arguments have to be acquired. One
//! that takes wide text needs the full Unicode command line, which on Windows
//! only the OS can hand back (the CRT's narrow argv is lossy). One that takes
//! narrow text can use whatever the process startup code already split.
//! Which source is used is fixed at compile time, see [`DefaultArgs`].

use std::ffi::{OsStr, OsString};

use anyhow::{bail, Result};

/// Command-line tokens as delivered to this process. Token 0 is always the
/// program's own invocation path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessArgs {
    tokens: Vec<OsString>,
}

impl ProcessArgs {
    pub fn new<I, S>(tokens: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        let tokens: Vec<OsString> = tokens.into_iter().map(Into::into).collect();
        if tokens.is_empty() {
            bail!("command line has no program name");
        }
        Ok(Self { tokens })
    }

    pub fn argc(&self) -> usize {
        self.tokens.len()
    }

    pub fn argv(&self) -> &[OsString] {
        &self.tokens
    }

    /// Token 0.
    pub fn program(&self) -> &OsStr {
        &self.tokens[0]
    }
}

/// Text width the embedded interpreter wants its arguments in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextWidth {
    Narrow,
    Wide,
}

pub trait ArgumentSource {
    const WIDTH: TextWidth;

    fn acquire(&self) -> Result<ProcessArgs>;
}

/// Re-reads the command line from the OS as one wide string and splits it
/// with the platform tokenizer.
#[derive(Debug, Default, Clone, Copy)]
pub struct CommandLineArgs;

/// Uses the argv the process startup code computed, without re-parsing.
#[derive(Debug, Default, Clone, Copy)]
pub struct StartupArgs;

#[cfg(not(feature = "narrow-args"))]
pub type DefaultArgs = CommandLineArgs;
#[cfg(feature = "narrow-args")]
pub type DefaultArgs = StartupArgs;

impl ArgumentSource for StartupArgs {
    const WIDTH: TextWidth = TextWidth::Narrow;

    fn acquire(&self) -> Result<ProcessArgs> {
        ProcessArgs::new(std::env::args_os())
    }
}

impl ArgumentSource for CommandLineArgs {
    const WIDTH: TextWidth = TextWidth::Wide;

    #[cfg(windows)]
    fn acquire(&self) -> Result<ProcessArgs> {
        windows::command_line_argv()
    }

    // Only Windows has a wide command line. Elsewhere argv is bytes and the
    // interpreter decodes it with the locale encoding.
    #[cfg(not(windows))]
    fn acquire(&self) -> Result<ProcessArgs> {
        ProcessArgs::new(std::env::args_os())
    }
}

#[cfg(windows)]
mod windows {
    use std::ffi::OsString;
    use std::os::windows::ffi::OsStringExt;

    use anyhow::{bail, Context, Result};
    use windows_sys::Win32::Foundation::LocalFree;
    use windows_sys::Win32::System::Environment::GetCommandLineW;
    use windows_sys::Win32::UI::Shell::CommandLineToArgvW;

    use super::ProcessArgs;

    pub(super) fn command_line_argv() -> Result<ProcessArgs> {
        // SAFETY: GetCommandLineW returns a NUL-terminated string owned by
        // the process that stays valid for its lifetime.
        let line = unsafe {
            let ptr = GetCommandLineW();
            std::slice::from_raw_parts(ptr, wide_len(ptr))
        };
        split_command_line(line)
    }

    /// Splits `line` with the shell's tokenizer, the same rules the CRT and
    /// the interpreter use. The returned count is the corrected argc.
    pub(super) fn split_command_line(line: &[u16]) -> Result<ProcessArgs> {
        let terminated: Vec<u16> = line.iter().copied().chain(std::iter::once(0)).collect();
        let mut argc: i32 = 0;
        // SAFETY: `terminated` is NUL-terminated and outlives the call.
        let argv = unsafe { CommandLineToArgvW(terminated.as_ptr(), &mut argc) };
        if argv.is_null() {
            return Err(std::io::Error::last_os_error())
                .context("CommandLineToArgvW failed to split the command line");
        }

        let count = usize::try_from(argc).unwrap_or(0);
        let mut tokens = Vec::with_capacity(count);
        for i in 0..count {
            // SAFETY: the array holds argc NUL-terminated strings.
            let token = unsafe {
                let ptr = *argv.add(i);
                OsString::from_wide(std::slice::from_raw_parts(ptr, wide_len(ptr)))
            };
            tokens.push(token);
        }

        // SAFETY: the array was allocated by CommandLineToArgvW and is not
        // used past this point.
        unsafe { LocalFree(argv.cast()) };

        if tokens.is_empty() {
            bail!("CommandLineToArgvW returned no tokens");
        }
        ProcessArgs::new(tokens)
    }

    unsafe fn wide_len(ptr: *const u16) -> usize {
        let mut len = 0;
        while *ptr.add(len) != 0 {
            len += 1;
        }
        len
    }

}
