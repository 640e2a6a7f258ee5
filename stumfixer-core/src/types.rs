//! Domain types for the audio card profile fixer.
//!
//! All types are serializable/deserializable via serde + serde_yaml.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// A PulseAudio card profile name, e.g. `output:hdmi-stereo`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CardProfile(pub String);

impl CardProfile {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CardProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for CardProfile {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for CardProfile {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Profile rules
// ---------------------------------------------------------------------------

/// Select `profile` whenever the connected product name starts with
/// `product_prefix`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileRule {
    pub product_prefix: String,
    pub profile: CardProfile,
}

impl ProfileRule {
    pub fn new(product_prefix: impl Into<String>, profile: impl Into<CardProfile>) -> Self {
        Self {
            product_prefix: product_prefix.into(),
            profile: profile.into(),
        }
    }

    pub fn matches(&self, product: &str) -> bool {
        product.starts_with(&self.product_prefix)
    }
}

pub const ANALOG_DUPLEX: &str = "output:analog-stereo+input:analog-stereo";
pub const HDMI_STEREO: &str = "output:hdmi-stereo";

/// Rules shipped when the config file does not override them.
pub fn default_rules() -> Vec<ProfileRule> {
    vec![
        ProfileRule::new("DELL", ANALOG_DUPLEX),
        ProfileRule::new("BenQ", HDMI_STEREO),
    ]
}

pub fn default_fallback_profile() -> CardProfile {
    CardProfile::from(ANALOG_DUPLEX)
}
