//! Stumfixer core library — collaborator traits, domain types, configuration.
//!
//! - [`control`] — the observe/apply/decide seams the daemon loop is generic over
//! - [`types`] — card profile newtype and profile rules
//! - [`config`] — [`DaemonConfig`] and YAML loading
//! - [`error`] — [`ConfigError`], [`CollaboratorError`]

pub mod config;
pub mod control;
pub mod error;
pub mod types;

pub use config::{DaemonConfig, PacmdConfig};
pub use control::{Collaborator, Observation, Policy, StateOf};
pub use error::{CollaboratorError, ConfigError};
pub use types::{CardProfile, ProfileRule};
