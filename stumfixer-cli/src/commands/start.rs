//! `stumfixer start [--foreground]`

use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Args;

use stumfixer_core::config;
use stumfixer_daemon::{start_blocking, DaemonError, StartOptions};
use stumfixer_detector::{Pacmd, ProfileRules};

/// Detach into the background and keep the card profile corrected.
#[derive(Args, Debug)]
pub struct StartArgs {
    /// Stay attached to the terminal (for service managers and debugging).
    #[arg(long)]
    pub foreground: bool,
}

impl StartArgs {
    pub fn run(self, config_path: Option<&Path>) -> Result<ExitCode> {
        let config = config::resolve(config_path).context("failed to load config")?;
        let options = StartOptions::from_config(&config, self.foreground)
            .context("failed to prepare daemon paths")?;

        let pacmd = Pacmd::new(&config.pacmd.binary, config.pacmd.card.clone());
        let rules = ProfileRules::new(config.rules.clone(), config.fallback_profile.clone());

        match start_blocking(&options, pacmd, rules) {
            Ok(()) => Ok(ExitCode::SUCCESS),
            Err(DaemonError::AlreadyRunning { pid_file }) => {
                eprintln!("stumfixer is already running (pid file {})", pid_file.display());
                Ok(ExitCode::FAILURE)
            }
            Err(err) => Err(err).context("daemon exited with error"),
        }
    }
}
