//! Error types for stumfixer-core.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while locating, reading, or validating the daemon config.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML parse error — includes file path and line context from serde_yaml.
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// An explicitly requested config file does not exist.
    #[error("config not found at {path}")]
    NotFound { path: PathBuf },

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Failures reported by an external state collaborator.
#[derive(Debug, Error)]
pub enum CollaboratorError {
    /// The helper program could not be started at all.
    #[error("could not run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The helper program ran but exited unsuccessfully.
    #[error("{program} exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: String,
        stderr: String,
    },

    /// The helper output could not be interpreted.
    #[error("malformed collaborator output: {0}")]
    Malformed(String),
}
