//! Turn the foreground invocation into a session-less background process.
//!
//! Must run before any async runtime or other thread exists: `fork()` only
//! duplicates the calling thread, so locks held by other threads would stay
//! locked forever in the child.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::os::fd::{AsRawFd, RawFd};
use std::path::{Path, PathBuf};

use nix::sys::stat::{umask, Mode};
use nix::unistd::{fork, setsid, ForkResult};

use crate::error::{io_err, DaemonError};
use crate::handle::DaemonHandle;
use crate::pid_file;

/// Where the detached process's standard streams point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetachTargets {
    pub stdin: PathBuf,
    pub stdout: PathBuf,
    pub stderr: PathBuf,
}

impl DetachTargets {
    /// stdin from `/dev/null`, stdout and stderr appended to `log_file`.
    pub fn log_file(log_file: &Path) -> Self {
        Self {
            stdin: PathBuf::from("/dev/null"),
            stdout: log_file.to_path_buf(),
            stderr: log_file.to_path_buf(),
        }
    }
}

/// Detach from the controlling terminal and take the pid file lock.
///
/// Returns only in the final background process. Both intermediate parents
/// exit with status 0. The pid file check runs first, so a conflict is
/// reported on the caller's terminal before anything forks.
pub fn detach(pid_path: &Path, targets: &DetachTargets) -> Result<DaemonHandle, DaemonError> {
    pid_file::ensure_absent(pid_path)?;

    // Anything still buffered would otherwise be written by both branches.
    flush_std_streams();

    // SAFETY: called from `main` before the tokio runtime or any other thread
    // is started, so the child inherits a consistent single-threaded image.
    match unsafe { fork() }.map_err(|source| DaemonError::Detach {
        stage: "first fork",
        source,
    })? {
        ForkResult::Parent { .. } => std::process::exit(0),
        ForkResult::Child => {}
    }

    std::env::set_current_dir("/").map_err(|e| io_err("/", e))?;
    umask(Mode::empty());
    setsid().map_err(|source| DaemonError::Detach {
        stage: "setsid",
        source,
    })?;

    // SAFETY: still single-threaded; we are the first child. The session
    // leader exits so the grandchild can never reacquire a terminal.
    match unsafe { fork() }.map_err(|source| DaemonError::Detach {
        stage: "second fork",
        source,
    })? {
        ForkResult::Parent { .. } => std::process::exit(0),
        ForkResult::Child => {}
    }

    flush_std_streams();
    redirect_std_streams(targets)?;

    DaemonHandle::acquire(pid_path)
}

fn flush_std_streams() {
    let _ = io::stdout().flush();
    let _ = io::stderr().flush();
}

fn redirect_std_streams(targets: &DetachTargets) -> Result<(), DaemonError> {
    let stdin = File::open(&targets.stdin).map_err(|e| io_err(&targets.stdin, e))?;
    let stdout = open_append(&targets.stdout)?;
    let stderr = open_append(&targets.stderr)?;

    replace_fd(&stdin, libc::STDIN_FILENO, &targets.stdin)?;
    replace_fd(&stdout, libc::STDOUT_FILENO, &targets.stdout)?;
    replace_fd(&stderr, libc::STDERR_FILENO, &targets.stderr)?;
    // The opened files close on drop; fds 0-2 keep their own references.
    Ok(())
}

fn open_append(path: &Path) -> Result<File, DaemonError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if !parent.exists() {
            std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
        }
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| io_err(path, e))
}

fn replace_fd(file: &File, target: RawFd, path: &Path) -> Result<(), DaemonError> {
    // SAFETY: `file` is open for the duration of the call and `target` is one
    // of the three standard descriptors, which this process owns.
    if unsafe { libc::dup2(file.as_raw_fd(), target) } == -1 {
        return Err(io_err(path, io::Error::last_os_error()));
    }
    Ok(())
}
