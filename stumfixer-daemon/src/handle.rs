use std::path::Path;

use tokio::sync::broadcast;

use crate::error::DaemonError;
use crate::pid_file::PidFile;

/// Ownership of one running instance: the pid file lock plus the shutdown
/// channel the control loop listens on.
///
/// Dropping the handle removes the pid file, so every exit path that unwinds
/// the stack (normal return, error return, panic) releases the lock.
#[derive(Debug)]
pub struct DaemonHandle {
    pid_file: PidFile,
    shutdown: broadcast::Sender<()>,
}

impl DaemonHandle {
    /// Take the single-instance lock at `pid_path` for the current process.
    pub fn acquire(pid_path: &Path) -> Result<Self, DaemonError> {
        let pid_file = PidFile::create(pid_path)?;
        let (shutdown, _) = broadcast::channel(4);
        Ok(Self { pid_file, shutdown })
    }

    pub fn pid(&self) -> u32 {
        self.pid_file.pid()
    }

    pub fn pid_file(&self) -> &Path {
        self.pid_file.path()
    }

    /// Receiver that resolves once shutdown has been requested.
    ///
    /// Only requests sent after subscribing are seen.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.shutdown.subscribe()
    }

    pub fn shutdown_sender(&self) -> broadcast::Sender<()> {
        self.shutdown.clone()
    }

    pub fn request_shutdown(&self) {
        let _ = self.shutdown.send(());
    }
}
