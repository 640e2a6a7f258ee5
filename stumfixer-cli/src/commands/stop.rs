//! `stumfixer stop`

use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Args;

use stumfixer_core::config;
use stumfixer_daemon::{DaemonError, StartOptions};

/// Send SIGTERM to the running instance.
#[derive(Args, Debug)]
pub struct StopArgs {}

impl StopArgs {
    pub fn run(self, config_path: Option<&Path>) -> Result<ExitCode> {
        let config = config::resolve(config_path).context("failed to load config")?;
        // Resolve exactly as `start` did so relative paths agree.
        let options = StartOptions::from_config(&config, false)
            .context("failed to prepare daemon paths")?;

        match stumfixer_daemon::stop(&options.pid_file) {
            Ok(pid) => {
                println!("sent SIGTERM to stumfixer (pid {pid})");
                Ok(ExitCode::SUCCESS)
            }
            Err(DaemonError::NotRunning { .. }) => {
                eprintln!("Not running");
                Ok(ExitCode::FAILURE)
            }
            Err(err) => Err(err).context("failed to stop daemon"),
        }
    }
}
