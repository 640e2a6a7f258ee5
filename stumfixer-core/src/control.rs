//! Seams between the daemon control loop and the environment it corrects.
//!
//! The loop only ever compares and displays states; what a state *is* comes
//! from the [`Collaborator`] implementation plugged in at startup.

use std::fmt;

use crate::error::CollaboratorError;

/// A snapshot produced by [`Collaborator::observe`].
pub trait Observation {
    type State: Clone + PartialEq + fmt::Display;

    /// The state the environment is in right now.
    fn current(&self) -> &Self::State;
}

/// State type carried by a collaborator's observations.
pub type StateOf<C> = <<C as Collaborator>::Observation as Observation>::State;

/// The external system being observed and corrected.
pub trait Collaborator {
    type Observation: Observation;

    fn observe(&mut self) -> Result<Self::Observation, CollaboratorError>;

    fn apply(&mut self, desired: &StateOf<Self>) -> Result<(), CollaboratorError>;
}

/// Maps an observation to the state the environment should be in.
///
/// Must be a pure function of the observation.
pub trait Policy<O: Observation> {
    fn decide(&self, observation: &O) -> O::State;
}

impl<O: Observation, P: Policy<O> + ?Sized> Policy<O> for &P {
    fn decide(&self, observation: &O) -> O::State {
        (**self).decide(observation)
    }
}
