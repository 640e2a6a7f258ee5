//! Daemon configuration.
//!
//! # Resolution
//!
//! ```text
//! --config <path>                         (must exist)
//! $STUMFIXER_CONFIG                       (must exist)
//! <config_dir>/stumfixer/config.yaml      (used when present)
//! built-in defaults
//! ```
//!
//! Every field is optional in the YAML file; missing keys take the defaults
//! below.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::types::{default_fallback_profile, default_rules, CardProfile, ProfileRule};

pub const CONFIG_ENV: &str = "STUMFIXER_CONFIG";
pub const DEFAULT_PID_FILE: &str = "/tmp/stumfixer.pid";
pub const DEFAULT_LOG_FILE: &str = "/tmp/stumfixer.log";
pub const DEFAULT_MAX_LOG_BYTES: u64 = 1_000_000;
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    /// Single-instance lock; holds the background process id.
    pub pid_file: PathBuf,
    /// Target for the detached process's stdout and stderr.
    pub log_file: PathBuf,
    /// The log file is truncated once it grows past this many bytes.
    pub max_log_bytes: u64,
    pub poll_interval_secs: u64,
    pub pacmd: PacmdConfig,
    /// Checked in order; the first matching prefix wins.
    pub rules: Vec<ProfileRule>,
    pub fallback_profile: CardProfile,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PacmdConfig {
    pub binary: PathBuf,
    /// Card index or name passed to `set-card-profile`.
    pub card: String,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            pid_file: PathBuf::from(DEFAULT_PID_FILE),
            log_file: PathBuf::from(DEFAULT_LOG_FILE),
            max_log_bytes: DEFAULT_MAX_LOG_BYTES,
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            pacmd: PacmdConfig::default(),
            rules: default_rules(),
            fallback_profile: default_fallback_profile(),
        }
    }
}

impl Default for PacmdConfig {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("pacmd"),
            card: "0".to_string(),
        }
    }
}

impl DaemonConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_log_bytes == 0 {
            return Err(ConfigError::Invalid(
                "max_log_bytes must be greater than zero".to_string(),
            ));
        }
        if self.poll_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "poll_interval_secs must be greater than zero".to_string(),
            ));
        }
        if self.pacmd.binary.as_os_str().is_empty() {
            return Err(ConfigError::Invalid(
                "pacmd.binary must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Load and validate the config stored at `path`.
pub fn load_at(path: &Path) -> Result<DaemonConfig, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound {
            path: path.to_path_buf(),
        });
    }
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    // An empty file is a valid "all defaults" config.
    let config = if contents.trim().is_empty() {
        DaemonConfig::default()
    } else {
        serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?
    };
    config.validate()?;
    Ok(config)
}

/// Resolve the effective config: explicit path, then `$STUMFIXER_CONFIG`,
/// then the per-user config file, then defaults.
pub fn resolve(explicit: Option<&Path>) -> Result<DaemonConfig, ConfigError> {
    if let Some(path) = explicit {
        return load_at(path);
    }
    if let Some(path) = std::env::var_os(CONFIG_ENV).filter(|v| !v.is_empty()) {
        return load_at(Path::new(&path));
    }
    match user_config_path() {
        Some(path) if path.exists() => load_at(&path),
        _ => Ok(DaemonConfig::default()),
    }
}

/// `<config_dir>/stumfixer/config.yaml` — pure, no I/O.
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("stumfixer").join("config.yaml"))
}
