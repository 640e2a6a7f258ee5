//! stumfixer — keeps the PulseAudio card profile matched to the connected
//! display.
//!
//! # Usage
//!
//! ```text
//! stumfixer [--config <path>] start [--foreground]
//! stumfixer [--config <path>] stop
//! ```

mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use commands::{start::StartArgs, stop::StopArgs};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "stumfixer",
    version,
    about = "Switch the audio card profile to match the attached display",
    long_about = None,
)]
struct Cli {
    /// Config file (YAML). Defaults to $STUMFIXER_CONFIG, then
    /// <config dir>/stumfixer/config.yaml, then built-in defaults.
    #[arg(long, short = 'c', global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Detach into the background and keep the card profile corrected.
    Start(StartArgs),

    /// Send SIGTERM to the running instance.
    Stop(StopArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

// Returns instead of calling `process::exit` so the pid file guard held
// further down the stack is always dropped.
fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            return if err.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    let result = match cli.command {
        Commands::Start(args) => args.run(cli.config.as_deref()),
        Commands::Stop(args) => args.run(cli.config.as_deref()),
    };

    match result {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
