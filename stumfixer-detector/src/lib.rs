//! Default collaborator for `stumfixer`: PulseAudio via `pacmd`.
//!
//! [`Pacmd`] observes the card state by parsing `pacmd list-cards` and applies
//! corrections with `pacmd set-card-profile`. [`ProfileRules`] decides which
//! profile a card should use from the connected product name.

use std::path::PathBuf;
use std::process::{Command, Output};

use stumfixer_core::{CardProfile, Collaborator, CollaboratorError, Observation, Policy, ProfileRule};

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// What `pacmd list-cards` reported on one poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardStatus {
    pub active_profile: CardProfile,
    /// Last `device.product.name` in the listing, if any.
    pub product: Option<String>,
}

impl Observation for CardStatus {
    type State = CardProfile;

    fn current(&self) -> &CardProfile {
        &self.active_profile
    }
}

/// `pacmd` backed collaborator.
#[derive(Debug, Clone)]
pub struct Pacmd {
    binary: PathBuf,
    card: String,
}

/// Prefix rules mapping product names to card profiles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileRules {
    rules: Vec<ProfileRule>,
    fallback: CardProfile,
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

const ACTIVE_PROFILE_KEY: &str = "active profile:";
const PRODUCT_NAME_KEY: &str = "device.product.name";

/// Parse the text printed by `pacmd list-cards`.
///
/// Returns [`CollaboratorError::Malformed`] when no active profile is listed.
pub fn parse_list_cards(text: &str) -> Result<CardStatus, CollaboratorError> {
    let mut active_profile = None;
    let mut product = None;

    for line in text.lines().map(str::trim) {
        if let Some(rest) = line.strip_prefix(ACTIVE_PROFILE_KEY) {
            let name = rest.trim().trim_start_matches('<').trim_end_matches('>');
            active_profile = Some(CardProfile::from(name));
        } else if let Some(rest) = line.strip_prefix(PRODUCT_NAME_KEY) {
            let Some(value) = rest.trim_start().strip_prefix('=') else {
                continue;
            };
            product = Some(value.trim().trim_matches('"').to_string());
        }
    }

    let active_profile = active_profile
        .ok_or_else(|| CollaboratorError::Malformed("active profile is missing".to_string()))?;
    Ok(CardStatus {
        active_profile,
        product,
    })
}

// ---------------------------------------------------------------------------
// pacmd collaborator
// ---------------------------------------------------------------------------

impl Pacmd {
    pub fn new(binary: impl Into<PathBuf>, card: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            card: card.into(),
        }
    }

    fn run(&self, args: &[&str]) -> Result<Output, CollaboratorError> {
        let program = self.binary.display().to_string();
        let output = Command::new(&self.binary)
            .args(args)
            .output()
            .map_err(|source| CollaboratorError::Spawn {
                program: program.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(CollaboratorError::Failed {
                program,
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(output)
    }
}

impl Collaborator for Pacmd {
    type Observation = CardStatus;

    fn observe(&mut self) -> Result<CardStatus, CollaboratorError> {
        let output = self.run(&["list-cards"])?;
        parse_list_cards(&String::from_utf8_lossy(&output.stdout))
    }

    fn apply(&mut self, desired: &CardProfile) -> Result<(), CollaboratorError> {
        tracing::debug!(card = %self.card, profile = %desired, "running set-card-profile");
        self.run(&["set-card-profile", self.card.as_str(), desired.as_str()])?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Decision policy
// ---------------------------------------------------------------------------

impl ProfileRules {
    pub fn new(rules: Vec<ProfileRule>, fallback: CardProfile) -> Self {
        Self { rules, fallback }
    }

    /// Profile for `product`; the fallback when nothing matches.
    pub fn profile_for(&self, product: Option<&str>) -> &CardProfile {
        product
            .and_then(|name| self.rules.iter().find(|rule| rule.matches(name)))
            .map(|rule| &rule.profile)
            .unwrap_or(&self.fallback)
    }
}

impl Policy<CardStatus> for ProfileRules {
    fn decide(&self, observation: &CardStatus) -> CardProfile {
        self.profile_for(observation.product.as_deref()).clone()
    }
}
