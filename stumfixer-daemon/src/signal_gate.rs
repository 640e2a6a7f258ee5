//! Converts SIGTERM/SIGINT into a shutdown request for the control loop.
//!
//! The handler itself only logs and broadcasts; pid file removal happens when
//! the [`DaemonHandle`](crate::DaemonHandle) is dropped on the way out.
//!
//! Between taking the pid file and installing the gate the default disposition
//! would kill the process without unwinding. [`TerminationMask`] holds both
//! signals pending over that window.

use nix::sys::signal::{pthread_sigmask, SigSet, SigmaskHow, Signal};
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::error::{io_err, DaemonError};

/// Installed termination handler. Dropping it stops listening.
#[derive(Debug)]
pub struct SignalGate {
    task: JoinHandle<()>,
}

impl SignalGate {
    /// Register for SIGTERM and SIGINT and forward the first one received to
    /// `shutdown`. Must be called from inside a tokio runtime.
    pub fn install(shutdown: broadcast::Sender<()>) -> Result<Self, DaemonError> {
        let mut terminate =
            signal(SignalKind::terminate()).map_err(|e| io_err("SIGTERM handler", e))?;
        let mut interrupt =
            signal(SignalKind::interrupt()).map_err(|e| io_err("SIGINT handler", e))?;

        let task = tokio::spawn(async move {
            let received = tokio::select! {
                _ = terminate.recv() => "SIGTERM",
                _ = interrupt.recv() => "SIGINT",
            };
            tracing::info!(signal = received, "quitting daemon");
            let _ = shutdown.send(());
        });

        Ok(Self { task })
    }
}

impl Drop for SignalGate {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// SIGTERM and SIGINT blocked on the calling thread until dropped.
///
/// A signal that arrives while blocked stays pending and is delivered when
/// the previous mask is restored, so it reaches a gate installed in between.
/// The mask survives `fork()`.
#[derive(Debug)]
pub struct TerminationMask {
    previous: SigSet,
}

impl TerminationMask {
    pub fn block() -> Result<Self, DaemonError> {
        let mut termination = SigSet::empty();
        termination.add(Signal::SIGTERM);
        termination.add(Signal::SIGINT);
        let mut previous = SigSet::empty();
        pthread_sigmask(SigmaskHow::SIG_BLOCK, Some(&termination), Some(&mut previous))
            .map_err(|source| DaemonError::SignalMask { source })?;
        Ok(Self { previous })
    }
}

impl Drop for TerminationMask {
    fn drop(&mut self) {
        let _ = pthread_sigmask(SigmaskHow::SIG_SETMASK, Some(&self.previous), None);
    }
}
