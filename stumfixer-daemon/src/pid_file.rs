//! Process-id file used as the single-instance lock.
//!
//! The file's presence is the only record of a running instance. It holds the
//! decimal pid of the background process followed by a newline.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;

use crate::error::{io_err, DaemonError};

/// A pid file created by this process. Removed again on drop.
#[derive(Debug)]
pub struct PidFile {
    path: PathBuf,
    pid: u32,
}

impl PidFile {
    /// Create `path` holding the current process id.
    ///
    /// Fails with [`DaemonError::AlreadyRunning`] if the file already exists;
    /// an existing file is never overwritten.
    pub fn create(path: impl Into<PathBuf>) -> Result<Self, DaemonError> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
            }
        }

        let mut file = match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
        {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                return Err(DaemonError::AlreadyRunning { pid_file: path });
            }
            Err(err) => return Err(io_err(&path, err)),
        };

        let pid = std::process::id();
        // From here on the guard owns the file, so a failed write still cleans up.
        let guard = Self { path, pid };
        writeln!(file, "{pid}").map_err(|e| io_err(&guard.path, e))?;
        file.sync_all().map_err(|e| io_err(&guard.path, e))?;
        Ok(guard)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }
}

impl Drop for PidFile {
    fn drop(&mut self) {
        match fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => {
                tracing::warn!(path = %self.path.display(), error = %err, "failed to remove pid file");
            }
        }
    }
}

/// Fail with [`DaemonError::AlreadyRunning`] if `path` exists.
pub fn ensure_absent(path: &Path) -> Result<(), DaemonError> {
    match fs::symlink_metadata(path) {
        Ok(_) => Err(DaemonError::AlreadyRunning {
            pid_file: path.to_path_buf(),
        }),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
        Err(err) => Err(io_err(path, err)),
    }
}

/// Read the pid recorded in `path`.
///
/// A missing file is [`DaemonError::NotRunning`]. Anything other than a
/// positive decimal pid is [`DaemonError::InvalidPidFile`]; zero and negative
/// values would address process groups when signalled.
pub fn read_pid(path: &Path) -> Result<i32, DaemonError> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            return Err(DaemonError::NotRunning {
                pid_file: path.to_path_buf(),
            });
        }
        Err(err) => return Err(io_err(path, err)),
    };

    match contents.trim().parse::<i32>() {
        Ok(pid) if pid > 0 => Ok(pid),
        _ => Err(DaemonError::InvalidPidFile {
            path: path.to_path_buf(),
            contents,
        }),
    }
}

/// Deliver SIGTERM to the instance recorded in `path` and return its pid.
///
/// The pid is not checked against the live process table; a stale file left
/// by a crashed instance can name an unrelated process.
pub fn stop(path: &Path) -> Result<i32, DaemonError> {
    let pid = read_pid(path)?;
    kill(Pid::from_raw(pid), Signal::SIGTERM).map_err(|source| DaemonError::Signal { pid, source })?;
    Ok(pid)
}
