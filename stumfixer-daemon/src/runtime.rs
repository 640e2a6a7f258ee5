use std::path::{Path, PathBuf};
use std::time::Duration;

use stumfixer_core::{Collaborator, DaemonConfig, Policy};

use crate::control_loop::ControlLoop;
use crate::detach::{detach, DetachTargets};
use crate::error::{io_err, DaemonError};
use crate::handle::DaemonHandle;
use crate::log_guard::LogGuard;
use crate::signal_gate::{SignalGate, TerminationMask};

pub const LOG_ENV: &str = "STUMFIXER_LOG";

/// How `start_blocking` should launch the instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartOptions {
    pub pid_file: PathBuf,
    pub log_file: PathBuf,
    pub max_log_bytes: u64,
    pub poll_interval: Duration,
    /// Keep the terminal: no detach, no stream redirection, no log guard.
    pub foreground: bool,
}

impl StartOptions {
    /// Options from `config`. Relative paths are resolved against the current
    /// directory now, because a detached process runs from `/`.
    pub fn from_config(config: &DaemonConfig, foreground: bool) -> Result<Self, DaemonError> {
        Ok(Self {
            pid_file: absolute(&config.pid_file)?,
            log_file: absolute(&config.log_file)?,
            max_log_bytes: config.max_log_bytes,
            poll_interval: config.poll_interval(),
            foreground,
        })
    }
}

/// Start the instance and block until it shuts down.
///
/// Without `foreground` this detaches first and only returns in the
/// background process. Must be called before any other thread is spawned.
pub fn start_blocking<C, P>(
    options: &StartOptions,
    collaborator: C,
    policy: P,
) -> Result<(), DaemonError>
where
    C: Collaborator,
    P: Policy<C::Observation>,
{
    // Held until the gate is installed, so an early SIGTERM still unwinds.
    let mask = TerminationMask::block()?;
    let handle = if options.foreground {
        DaemonHandle::acquire(&options.pid_file)?
    } else {
        detach(&options.pid_file, &DetachTargets::log_file(&options.log_file))?
    };
    init_tracing(!options.foreground);
    tracing::info!(pid = handle.pid(), pid_file = %handle.pid_file().display(), "stumfixer daemon started");

    let mut control = ControlLoop::new(collaborator, policy, options.poll_interval);
    if !options.foreground {
        control = control.with_log_guard(LogGuard::new(&options.log_file, options.max_log_bytes));
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| io_err("tokio-runtime", e))?;
    let result = runtime.block_on(run_unmasking(&handle, control, mask));
    match &result {
        Ok(()) => tracing::info!("stumfixer daemon stopped"),
        Err(err) => tracing::error!(error = %err, "stumfixer daemon failed"),
    }
    result
}

/// Drive `control` under `handle` until a termination signal, an explicit
/// shutdown request, or an observation failure.
pub async fn run<C, P>(handle: &DaemonHandle, control: ControlLoop<C, P>) -> Result<(), DaemonError>
where
    C: Collaborator,
    P: Policy<C::Observation>,
{
    // Subscribe before the gate exists so no request can be missed.
    let shutdown = handle.subscribe();
    let _gate = SignalGate::install(handle.shutdown_sender())?;
    control.run(shutdown).await
}

async fn run_unmasking<C, P>(
    handle: &DaemonHandle,
    control: ControlLoop<C, P>,
    mask: TerminationMask,
) -> Result<(), DaemonError>
where
    C: Collaborator,
    P: Policy<C::Observation>,
{
    let shutdown = handle.subscribe();
    let _gate = SignalGate::install(handle.shutdown_sender())?;
    // Anything that arrived while masked is delivered to the gate now.
    drop(mask);
    control.run(shutdown).await
}

fn absolute(path: &Path) -> Result<PathBuf, DaemonError> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir().map_err(|e| io_err(".", e))?;
    Ok(cwd.join(path))
}

fn init_tracing(detached: bool) {
    use tracing_subscriber::fmt::time::ChronoLocal;
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(!detached)
        .with_timer(ChronoLocal::rfc_3339())
        .try_init();
}
