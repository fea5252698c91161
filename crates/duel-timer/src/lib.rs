//! Pausable countdowns for the duel client.
//!
//! A [`Countdown`] backs every visible timer in a match: the turn timer,
//! the mulligan countdown, and prompt deadlines. It can be paused (the
//! turn timer freezes while the server resolves effects) and resumed with
//! the remaining time intact.
//!
//! # Lazy expiry
//!
//! A running countdown stores only its deadline. Expiry is observed
//! lazily: once the deadline has passed, [`Countdown::phase`] reports
//! [`Phase::Expired`] without any background task having run. Callers
//! that need to *react* to expiry await [`Countdown::wait_expired`],
//! which pends forever while idle or paused, the same way a tick loop
//! pends in event-driven mode:
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         Some(cmd) = cmd_rx.recv() => { /* handle commands */ }
//!         () = countdown.wait_expired() => { /* time's up */ }
//!     }
//! }
//! ```

use std::time::Duration;

use tokio::time::{self, Instant};
use tracing::{debug, trace, warn};

/// Observable phase of a [`Countdown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Never started, or stopped.
    Idle,
    /// Counting down.
    Running,
    /// Frozen with time remaining.
    Paused,
    /// The deadline passed while running.
    Expired,
}

#[derive(Debug, Clone, Copy)]
enum State {
    Idle,
    Running { deadline: Instant },
    Paused { remaining: Duration },
}

/// A restartable, pausable countdown.
#[derive(Debug, Clone)]
pub struct Countdown {
    label: &'static str,
    duration: Duration,
    state: State,
}

impl Countdown {
    /// Creates an idle countdown of `duration`.
    ///
    /// A zero duration is allowed but almost certainly a configuration
    /// mistake; it is logged and the countdown expires as soon as started.
    pub fn new(label: &'static str, duration: Duration) -> Self {
        if duration.is_zero() {
            warn!(label, "countdown created with zero duration");
        }
        Self {
            label,
            duration,
            state: State::Idle,
        }
    }

    /// The full length of one run.
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Starts (or restarts) the countdown from its full duration.
    pub fn start(&mut self) {
        self.state = State::Running {
            deadline: Instant::now() + self.duration,
        };
        debug!(
            label = self.label,
            duration_ms = self.duration.as_millis() as u64,
            "countdown started"
        );
    }

    /// Starts the countdown only if it is not already running or paused.
    ///
    /// Returns `true` if a new run began. Repeated calls during a run
    /// leave the deadline untouched.
    pub fn start_if_idle(&mut self) -> bool {
        match self.phase() {
            Phase::Idle | Phase::Expired => {
                self.start();
                true
            }
            Phase::Running | Phase::Paused => {
                trace!(label = self.label, "countdown already active, not restarting");
                false
            }
        }
    }

    /// Freezes a running countdown, keeping the remaining time.
    ///
    /// Returns `false` (and does nothing) unless the countdown was running.
    pub fn pause(&mut self) -> bool {
        match self.state {
            State::Running { deadline } => {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    return false;
                }
                self.state = State::Paused { remaining };
                debug!(
                    label = self.label,
                    remaining_ms = remaining.as_millis() as u64,
                    "countdown paused"
                );
                true
            }
            State::Idle | State::Paused { .. } => false,
        }
    }

    /// Resumes a paused countdown with the time it had left.
    ///
    /// Returns `false` (and does nothing) unless the countdown was paused.
    pub fn resume(&mut self) -> bool {
        match self.state {
            State::Paused { remaining } => {
                self.state = State::Running {
                    deadline: Instant::now() + remaining,
                };
                debug!(
                    label = self.label,
                    remaining_ms = remaining.as_millis() as u64,
                    "countdown resumed"
                );
                true
            }
            State::Idle | State::Running { .. } => false,
        }
    }

    /// Stops the countdown and returns it to idle.
    pub fn stop(&mut self) {
        if !matches!(self.state, State::Idle) {
            debug!(label = self.label, "countdown stopped");
        }
        self.state = State::Idle;
    }

    /// Current phase, with expiry evaluated against the clock.
    pub fn phase(&self) -> Phase {
        match self.state {
            State::Idle => Phase::Idle,
            State::Paused { .. } => Phase::Paused,
            State::Running { deadline } if Instant::now() >= deadline => {
                Phase::Expired
            }
            State::Running { .. } => Phase::Running,
        }
    }

    /// Whether the countdown is actively counting.
    pub fn is_running(&self) -> bool {
        self.phase() == Phase::Running
    }

    /// Whether the countdown is frozen.
    pub fn is_paused(&self) -> bool {
        matches!(self.state, State::Paused { .. })
    }

    /// Time left, or `None` when idle. Zero once expired.
    pub fn remaining(&self) -> Option<Duration> {
        match self.state {
            State::Idle => None,
            State::Paused { remaining } => Some(remaining),
            State::Running { deadline } => {
                Some(deadline.saturating_duration_since(Instant::now()))
            }
        }
    }

    /// The instant the current run ends, if running.
    pub fn deadline(&self) -> Option<Instant> {
        match self.state {
            State::Running { deadline } => Some(deadline),
            State::Idle | State::Paused { .. } => None,
        }
    }

    /// Completes when the current run's deadline passes.
    ///
    /// While idle or paused this future pends forever; it never resolves
    /// on its own, but `tokio::select!` still processes other branches.
    /// Pausing does not wake an in-flight wait: re-create the future after
    /// any state change.
    pub async fn wait_expired(&self) {
        match self.state {
            State::Running { deadline } => time::sleep_until(deadline).await,
            State::Idle | State::Paused { .. } => {
                std::future::pending::<()>().await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_countdown_is_idle() {
        let c = Countdown::new("turn", Duration::from_secs(60));
        assert_eq!(c.phase(), Phase::Idle);
        assert_eq!(c.remaining(), None);
        assert_eq!(c.deadline(), None);
        assert_eq!(c.duration(), Duration::from_secs(60));
    }

    #[test]
    fn test_pause_and_resume_require_matching_state() {
        let mut c = Countdown::new("turn", Duration::from_secs(60));
        assert!(!c.pause());
        assert!(!c.resume());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_returns_to_idle() {
        let mut c = Countdown::new("turn", Duration::from_secs(60));
        c.start();
        c.stop();
        assert_eq!(c.phase(), Phase::Idle);
        assert!(c.start_if_idle());
    }
}
