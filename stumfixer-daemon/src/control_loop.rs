//! Steady-state behaviour: observe, decide, apply if different, housekeep,
//! sleep.

use std::time::Duration;

use stumfixer_core::{Collaborator, CollaboratorError, Observation, Policy, StateOf};
use tokio::sync::broadcast;

use crate::error::DaemonError;
use crate::log_guard::LogGuard;

/// What the loop knows about the environment between ticks.
#[derive(Debug, Clone, PartialEq)]
pub struct RunState<S> {
    /// State reported by the most recent observation.
    pub current: Option<S>,
    /// Last state successfully applied.
    pub last_applied: Option<S>,
}

impl<S> Default for RunState<S> {
    fn default() -> Self {
        Self {
            current: None,
            last_applied: None,
        }
    }
}

/// Result of one iteration.
#[derive(Debug)]
pub enum TickOutcome<S> {
    /// Desired state already in place; nothing was applied or logged.
    Unchanged,
    Applied { from: S, to: S },
    /// The correction failed; the mismatch persists and is retried next tick.
    ApplyFailed { desired: S, error: CollaboratorError },
}

pub struct ControlLoop<C: Collaborator, P> {
    collaborator: C,
    policy: P,
    interval: Duration,
    log_guard: Option<LogGuard>,
    state: RunState<StateOf<C>>,
}

impl<C, P> ControlLoop<C, P>
where
    C: Collaborator,
    P: Policy<C::Observation>,
{
    pub fn new(collaborator: C, policy: P, interval: Duration) -> Self {
        Self {
            collaborator,
            policy,
            interval,
            log_guard: None,
            state: RunState::default(),
        }
    }

    /// Check `guard` once per tick, after any correction.
    pub fn with_log_guard(mut self, guard: LogGuard) -> Self {
        self.log_guard = Some(guard);
        self
    }

    pub fn state(&self) -> &RunState<StateOf<C>> {
        &self.state
    }

    pub fn collaborator(&self) -> &C {
        &self.collaborator
    }

    /// Run one observe → decide → apply → housekeep iteration.
    ///
    /// An observation failure is returned as [`DaemonError::Observation`];
    /// an apply failure is logged and reported through the outcome.
    pub fn tick(&mut self) -> Result<TickOutcome<StateOf<C>>, DaemonError> {
        let observation = self
            .collaborator
            .observe()
            .map_err(DaemonError::Observation)?;
        let current = observation.current().clone();
        let desired = self.policy.decide(&observation);
        self.state.current = Some(current.clone());

        let outcome = if desired == current {
            TickOutcome::Unchanged
        } else {
            tracing::info!(from = %current, "setting state to {desired}");
            match self.collaborator.apply(&desired) {
                Ok(()) => {
                    self.state.last_applied = Some(desired.clone());
                    TickOutcome::Applied {
                        from: current,
                        to: desired,
                    }
                }
                Err(error) => {
                    tracing::warn!(error = %error, "could not apply {desired}, will retry");
                    TickOutcome::ApplyFailed { desired, error }
                }
            }
        };

        if let Some(guard) = &self.log_guard {
            guard.check();
        }

        Ok(outcome)
    }

    /// Tick every `interval` until `shutdown` fires.
    ///
    /// Returns `Ok(())` on shutdown and the first observation failure
    /// otherwise.
    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) -> Result<(), DaemonError> {
        loop {
            self.tick()?;
            tokio::select! {
                _ = shutdown.recv() => break,
                _ = tokio::time::sleep(self.interval) => {}
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::fmt;
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;
    use tokio::time::{advance, Instant};

    #[derive(Debug, Clone, PartialEq)]
    struct Profile(&'static str);

    impl fmt::Display for Profile {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(self.0)
        }
    }

    struct Seen {
        device: &'static str,
        current: Profile,
    }

    impl Observation for Seen {
        type State = Profile;

        fn current(&self) -> &Profile {
            &self.current
        }
    }

    /// In-memory environment: `apply` changes what the next `observe` sees.
    #[derive(Default)]
    struct FakeCard {
        device: &'static str,
        active: Option<Profile>,
        observe_failures: VecDeque<bool>,
        apply_failures: VecDeque<bool>,
        observed: Arc<AtomicUsize>,
        applied: Arc<Mutex<Vec<Profile>>>,
    }

    impl Collaborator for FakeCard {
        type Observation = Seen;

        fn observe(&mut self) -> Result<Seen, CollaboratorError> {
            self.observed.fetch_add(1, Ordering::SeqCst);
            if self.observe_failures.pop_front().unwrap_or(false) {
                return Err(CollaboratorError::Malformed("no card".to_string()));
            }
            Ok(Seen {
                device: self.device,
                current: self.active.clone().unwrap_or(Profile("unset")),
            })
        }

        fn apply(&mut self, desired: &Profile) -> Result<(), CollaboratorError> {
            if self.apply_failures.pop_front().unwrap_or(false) {
                return Err(CollaboratorError::Failed {
                    program: "fake".to_string(),
                    status: "exit status: 1".to_string(),
                    stderr: "busy".to_string(),
                });
            }
            self.applied.lock().unwrap().push(desired.clone());
            self.active = Some(desired.clone());
            Ok(())
        }
    }

    struct ByDevice;

    impl Policy<Seen> for ByDevice {
        fn decide(&self, observation: &Seen) -> Profile {
            if observation.device.starts_with("BenQ") {
                Profile("hdmi")
            } else {
                Profile("analog")
            }
        }
    }

    fn control(card: FakeCard) -> ControlLoop<FakeCard, ByDevice> {
        ControlLoop::new(card, ByDevice, Duration::from_secs(5))
    }

    #[test]
    fn applies_once_then_debounces() {
        let mut control = control(FakeCard {
            device: "BenQ GW2765",
            ..FakeCard::default()
        });

        let first = control.tick().unwrap();
        assert!(
            matches!(first, TickOutcome::Applied { ref from, ref to } if *from == Profile("unset") && *to == Profile("hdmi")),
            "got {first:?}"
        );
        let second = control.tick().unwrap();
        assert!(matches!(second, TickOutcome::Unchanged), "got {second:?}");

        assert_eq!(*control.collaborator().applied.lock().unwrap(), vec![Profile("hdmi")]);
        assert_eq!(control.state().current, Some(Profile("hdmi")));
        assert_eq!(control.state().last_applied, Some(Profile("hdmi")));
    }

    #[test]
    fn matching_state_never_applies() {
        let mut control = control(FakeCard {
            device: "DELL U2415",
            active: Some(Profile("analog")),
            ..FakeCard::default()
        });

        for _ in 0..3 {
            assert!(matches!(control.tick().unwrap(), TickOutcome::Unchanged));
        }
        assert!(control.collaborator().applied.lock().unwrap().is_empty());
        assert_eq!(control.state().last_applied, None);
    }

    #[test]
    fn apply_failure_is_retried_next_tick() {
        let mut control = control(FakeCard {
            device: "BenQ",
            apply_failures: VecDeque::from([true]),
            ..FakeCard::default()
        });

        let first = control.tick().unwrap();
        assert!(matches!(first, TickOutcome::ApplyFailed { .. }), "got {first:?}");
        assert_eq!(control.state().last_applied, None);

        let second = control.tick().unwrap();
        assert!(matches!(second, TickOutcome::Applied { .. }), "got {second:?}");
        assert_eq!(*control.collaborator().applied.lock().unwrap(), vec![Profile("hdmi")]);
    }

    #[test]
    fn observation_failure_is_fatal() {
        let mut control = control(FakeCard {
            observe_failures: VecDeque::from([true]),
            ..FakeCard::default()
        });

        let err = control.tick().unwrap_err();
        assert!(matches!(err, DaemonError::Observation(_)), "got {err:?}");
        assert!(control.collaborator().applied.lock().unwrap().is_empty());
    }

    #[test]
    fn tick_runs_log_guard() {
        let dir = TempDir::new().unwrap();
        let log = dir.path().join("stumfixer.log");
        fs::write(&log, vec![b'x'; 64]).unwrap();

        let mut control = control(FakeCard {
            device: "DELL",
            active: Some(Profile("analog")),
            ..FakeCard::default()
        })
        .with_log_guard(LogGuard::new(&log, 16));

        control.tick().unwrap();
        assert_eq!(fs::metadata(&log).unwrap().len(), 0);
    }

    #[tokio::test(start_paused = true, flavor = "current_thread")]
    async fn run_ticks_on_interval_until_shutdown() {
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let card = FakeCard {
            device: "BenQ",
            ..FakeCard::default()
        };
        let observed = card.observed.clone();
        let applied = card.applied.clone();

        let started = Instant::now();
        let stop_after = async {
            tokio::time::sleep(Duration::from_secs(12)).await;
            shutdown_tx.send(()).unwrap();
        };
        let (result, ()) = tokio::join!(control(card).run(shutdown_rx), stop_after);

        assert!(result.is_ok());
        assert!(started.elapsed() >= Duration::from_secs(12));
        // Ticks at t=0, 5 and 10; only the first one applies.
        assert_eq!(observed.load(Ordering::SeqCst), 3);
        assert_eq!(*applied.lock().unwrap(), vec![Profile("hdmi")]);
    }

    #[tokio::test(start_paused = true, flavor = "current_thread")]
    async fn run_returns_ok_on_shutdown() {
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let control = control(FakeCard {
            device: "DELL",
            ..FakeCard::default()
        });

        let task = tokio::spawn(control.run(shutdown_rx));
        advance(Duration::from_secs(1)).await;
        shutdown_tx.send(()).unwrap();
        assert!(task.await.unwrap().is_ok());
    }

    #[tokio::test(start_paused = true, flavor = "current_thread")]
    async fn run_stops_on_observation_failure() {
        let (_shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let control = control(FakeCard {
            device: "DELL",
            observe_failures: VecDeque::from([false, true]),
            ..FakeCard::default()
        });

        let err = control.run(shutdown_rx).await.unwrap_err();
        assert!(matches!(err, DaemonError::Observation(_)), "got {err:?}");
    }
}
