//! CPython as the embedded runtime
//!
//! Startup and shutdown go through the raw `pyo3::ffi` init API so the
//! program name lands in the interpreter's config before it initializes.
//! Everything after that uses pyo3's safe layer.

use std::ffi::OsStr;
use std::mem::MaybeUninit;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{anyhow, bail, Context, Result};
use pyo3::exceptions::PySystemExit;
use pyo3::ffi;
use pyo3::prelude::*;
use pyo3::types::{PyInt, PyList};

use crate::args::ProcessArgs;
use crate::runtime::{EmbeddedRuntime, EntryPoint, EntryStatus};

/// Set while a [`CPython`] exists; the interpreter is process-global.
static LIVE: AtomicBool = AtomicBool::new(false);

pub struct CPython {
    program_name: Option<std::ffi::OsString>,
    initialized: bool,
}

impl CPython {
    /// Claims the process's interpreter. Fails if another handle holds it.
    pub fn new() -> Result<Self> {
        if LIVE
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            bail!("a Python runtime is already live in this process");
        }
        Ok(Self {
            program_name: None,
            initialized: false,
        })
    }
}

impl Drop for CPython {
    fn drop(&mut self) {
        if self.initialized {
            if let Err(e) = self.finalize() {
                log::error!("{:#}", e);
            }
        }
        LIVE.store(false, Ordering::Release);
    }
}

impl EmbeddedRuntime for CPython {
    fn set_program_name(&mut self, program: &OsStr) -> Result<()> {
        if self.initialized {
            bail!("program name must be set before the interpreter starts");
        }
        self.program_name = Some(program.to_owned());
        Ok(())
    }

    fn initialize(&mut self) -> Result<()> {
        if self.initialized || unsafe { ffi::Py_IsInitialized() } != 0 {
            bail!("the Python interpreter is already initialized");
        }

        // SAFETY: PyConfig_InitPythonConfig fully initializes the struct, and
        // every exit below clears it exactly once.
        unsafe {
            let mut config = MaybeUninit::<ffi::PyConfig>::uninit();
            ffi::PyConfig_InitPythonConfig(config.as_mut_ptr());
            let mut config = config.assume_init();
            let cfg: *mut ffi::PyConfig = &mut config;

            // argv is installed after startup; nothing on it is an interpreter option.
            (*cfg).parse_argv = 0;

            if let Some(name) = &self.program_name {
                if let Err(e) = set_program_name(cfg, name) {
                    ffi::PyConfig_Clear(cfg);
                    return Err(e);
                }
            }

            let status = ffi::Py_InitializeFromConfig(cfg);
            ffi::PyConfig_Clear(cfg);
            check_status(status).context("Py_InitializeFromConfig failed")?;
        }

        self.initialized = true;
        log::debug!("Python {} initialized", Python::with_gil(|py| py.version().to_owned()));
        Ok(())
    }

    fn set_argv(&mut self, args: &ProcessArgs, update_path: bool) -> Result<()> {
        Python::with_gil(|py| -> PyResult<()> {
            let sys = py.import_bound("sys")?;
            sys.setattr("argv", PyList::new_bound(py, args.argv()))?;
            if update_path {
                let dir = Path::new(args.program()).parent().map(Path::to_path_buf).unwrap_or_default();
                sys.getattr("path")?.downcast_into::<PyList>()?.insert(0, dir)?;
            }
            Ok(())
        })
        .map_err(|e| anyhow!("sys.argv: {e}"))
    }

    fn extend_search_path(&mut self, dirs: &[PathBuf]) -> Result<()> {
        Python::with_gil(|py| -> PyResult<()> {
            let path = py.import_bound("sys")?.getattr("path")?.downcast_into::<PyList>()?;
            for (i, dir) in dirs.iter().enumerate() {
                log::debug!("Adding {} to sys.path", dir.display());
                path.insert(i, dir)?;
            }
            Ok(())
        })
        .map_err(|e| anyhow!("sys.path: {e}"))
    }

    fn run_entry(&mut self, entry: &EntryPoint) -> EntryStatus {
        Python::with_gil(|py| {
            let called = py
                .import_bound(entry.module())
                .and_then(|module| module.getattr(entry.function()))
                .and_then(|main| main.call0());
            match called {
                Ok(_) => EntryStatus::Returned,
                Err(err) => uncaught(py, err),
            }
        })
    }

    fn finalize(&mut self) -> Result<()> {
        if !self.initialized {
            bail!("the Python interpreter was never initialized");
        }
        self.initialized = false;
        // SAFETY: initialized by us on this thread, and no pyo3 handles
        // outlive the `with_gil` scopes above.
        if unsafe { ffi::Py_FinalizeEx() } != 0 {
            bail!("Py_FinalizeEx could not flush buffered data");
        }
        log::debug!("Python finalized");
        Ok(())
    }
}

/// Reports an error that escaped the entry the way the interpreter's own
/// top level does.
fn uncaught(py: Python<'_>, err: PyErr) -> EntryStatus {
    if !err.is_instance_of::<PySystemExit>(py) {
        err.print(py);
        return EntryStatus::Raised;
    }

    let code = match err.value_bound(py).getattr("code") {
        Ok(code) => code,
        Err(_) => return EntryStatus::Exited(1),
    };
    if code.is_none() {
        return EntryStatus::Exited(0);
    }
    if code.is_instance_of::<PyInt>() {
        // Out of C long range the interpreter's own conversion gives -1.
        return EntryStatus::Exited(code.extract::<i64>().map_or(-1, exit_status_from_long));
    }
    // `raise SystemExit("message")` prints the message and exits with 1.
    match code.str() {
        Ok(message) => eprintln!("{}", message.to_string_lossy()),
        Err(e) => e.print(py),
    }
    EntryStatus::Exited(1)
}

/// Narrows an exit code the way the interpreter's `(int)` cast does, keeping
/// the low 32 bits.
fn exit_status_from_long(code: i64) -> i32 {
    code as i32
}

#[cfg(windows)]
unsafe fn set_program_name(cfg: *mut ffi::PyConfig, name: &OsStr) -> Result<()> {
    use std::os::windows::ffi::OsStrExt;

    let wide: Vec<u16> = name.encode_wide().chain(std::iter::once(0)).collect();
    let status = ffi::PyConfig_SetString(cfg, std::ptr::addr_of_mut!((*cfg).program_name), wide.as_ptr().cast());
    check_status(status).context("could not set program name")
}

// Narrow argv is decoded with the locale encoding, same as the stock interpreter.
#[cfg(not(windows))]
unsafe fn set_program_name(cfg: *mut ffi::PyConfig, name: &OsStr) -> Result<()> {
    use std::os::unix::ffi::OsStrExt;

    let bytes = std::ffi::CString::new(name.as_bytes()).context("program name contains a NUL byte")?;
    let status = ffi::PyConfig_SetBytesString(cfg, std::ptr::addr_of_mut!((*cfg).program_name), bytes.as_ptr());
    check_status(status).context("could not set program name")
}

unsafe fn check_status(status: ffi::PyStatus) -> Result<()> {
    if ffi::PyStatus_Exception(status) == 0 {
        return Ok(());
    }
    if ffi::PyStatus_IsExit(status) != 0 {
        bail!("interpreter requested exit with status {}", status.exitcode);
    }
    let message = if status.err_msg.is_null() {
        "unknown error".to_owned()
    } else {
        std::ffi::CStr::from_ptr(status.err_msg).to_string_lossy().into_owned()
    };
    if status.func.is_null() {
        bail!("{message}");
    }
    let func = std::ffi::CStr::from_ptr(status.func).to_string_lossy();
    bail!("{func}: {message}")
}
