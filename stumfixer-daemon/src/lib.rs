//! Daemon lifecycle for stumfixer: detach, single-instance pid file, signal
//! driven shutdown, bounded log file, and the observe/apply control loop.

pub mod control_loop;
pub mod detach;
mod error;
mod handle;
pub mod log_guard;
pub mod pid_file;
mod runtime;
pub mod signal_gate;

pub use control_loop::{ControlLoop, RunState, TickOutcome};
pub use detach::{detach, DetachTargets};
pub use error::DaemonError;
pub use handle::DaemonHandle;
pub use log_guard::{check_and_truncate, LogGuard};
pub use pid_file::{read_pid, stop, PidFile};
pub use runtime::{run, start_blocking, StartOptions, LOG_ENV};
pub use signal_gate::{SignalGate, TerminationMask};
