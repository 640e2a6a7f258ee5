use std::path::PathBuf;

use stumfixer_core::CollaboratorError;
use thiserror::Error;

/// Error surface for the daemon lifecycle: pid file, detachment, control loop,
/// and the stop path.
#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("already running (pid file exists: {pid_file})")]
    AlreadyRunning { pid_file: PathBuf },

    #[error("could not detach from terminal: {stage} failed: {source}")]
    Detach {
        stage: &'static str,
        #[source]
        source: nix::Error,
    },

    #[error("could not mask termination signals: {source}")]
    SignalMask {
        #[source]
        source: nix::Error,
    },

    #[error("could not observe current state: {0}")]
    Observation(#[source] CollaboratorError),

    #[error("not running (no pid file at {pid_file})")]
    NotRunning { pid_file: PathBuf },

    #[error("pid file {path} does not hold a process id: {contents:?}")]
    InvalidPidFile { path: PathBuf, contents: String },

    #[error("could not signal pid {pid}: {source}")]
    Signal {
        pid: i32,
        #[source]
        source: nix::Error,
    },
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> DaemonError {
    DaemonError::Io {
        path: path.into(),
        source,
    }
}
