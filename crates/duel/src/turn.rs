//! Whose turn it is, and whether the local player may act.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use duel_protocol::PlayerId;
use duel_timer::{Countdown, Phase};
use tokio::sync::watch;
use tracing::{debug, info};

struct Clocks {
    turn_player: Option<PlayerId>,
    turn_timer: Countdown,
    mulligan: Countdown,
}

struct Inner {
    local: PlayerId,
    clocks: Mutex<Clocks>,
    operable: watch::Sender<bool>,
}

/// Turn tracking, the turn timer, the mulligan countdown, and the
/// operable flag.
///
/// The flag and the timers change together under one lock, so an
/// observer never sees a frozen timer with controls still enabled.
/// Operable starts `false` and is only granted by a `defrost`.
#[derive(Clone)]
pub struct TurnController {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for TurnController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TurnController")
            .field("local", &self.inner.local)
            .field("operable", &self.operable())
            .finish_non_exhaustive()
    }
}

impl TurnController {
    pub fn new(local: PlayerId, turn_timer: Duration, mulligan: Duration) -> Self {
        let (operable, _) = watch::channel(false);
        Self {
            inner: Arc::new(Inner {
                local,
                clocks: Mutex::new(Clocks {
                    turn_player: None,
                    turn_timer: Countdown::new("turn", turn_timer),
                    mulligan: Countdown::new("mulligan", mulligan),
                }),
                operable,
            }),
        }
    }

    pub fn local_player(&self) -> &PlayerId {
        &self.inner.local
    }

    /// The turn passed to `player`. Restarts the turn timer and, unless
    /// the turn is ours, withdraws the operable flag.
    ///
    /// Returns whether it is now the local player's turn.
    pub fn turn_changed(&self, player: PlayerId) -> bool {
        let mine = player == self.inner.local;
        let mut clocks = self.lock();
        info!(%player, mine, "turn changed");
        clocks.turn_player = Some(player);
        clocks.turn_timer.start();
        if !mine {
            self.set_operable(false);
        }
        mine
    }

    /// Pauses the turn timer and withdraws the operable flag.
    pub fn freeze(&self) {
        let mut clocks = self.lock();
        clocks.turn_timer.pause();
        self.set_operable(false);
    }

    /// Resumes the turn timer and grants the operable flag.
    pub fn defrost(&self) {
        let mut clocks = self.lock();
        clocks.turn_timer.resume();
        self.set_operable(true);
    }

    /// Starts the mulligan countdown unless one is already under way.
    ///
    /// Returns whether a new countdown began.
    pub fn start_mulligan(&self) -> bool {
        self.lock().mulligan.start_if_idle()
    }

    /// The local player ended the turn; controls stay off until the next
    /// `defrost`.
    pub fn end_turn(&self) {
        let _clocks = self.lock();
        self.set_operable(false);
    }

    pub fn operable(&self) -> bool {
        *self.inner.operable.borrow()
    }

    pub fn subscribe_operable(&self) -> watch::Receiver<bool> {
        self.inner.operable.subscribe()
    }

    pub fn turn_player(&self) -> Option<PlayerId> {
        self.lock().turn_player.clone()
    }

    pub fn is_my_turn(&self) -> bool {
        self.lock().turn_player.as_ref() == Some(&self.inner.local)
    }

    /// Time left on the turn timer, preserved while frozen.
    pub fn turn_remaining(&self) -> Option<Duration> {
        self.lock().turn_timer.remaining()
    }

    pub fn turn_phase(&self) -> Phase {
        self.lock().turn_timer.phase()
    }

    pub fn mulligan_remaining(&self) -> Option<Duration> {
        self.lock().mulligan.remaining()
    }

    pub fn mulligan_phase(&self) -> Phase {
        self.lock().mulligan.phase()
    }

    fn set_operable(&self, operable: bool) {
        let changed = self.inner.operable.send_if_modified(|current| {
            if *current == operable {
                return false;
            }
            *current = operable;
            true
        });
        if changed {
            debug!(operable, "operable flag changed");
        }
    }

    fn lock(&self) -> MutexGuard<'_, Clocks> {
        self.inner.clocks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller() -> TurnController {
        TurnController::new(
            PlayerId::from("me"),
            Duration::from_secs(60),
            Duration::from_secs(10),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_starts_inoperable() {
        let turn = controller();
        assert!(!turn.operable());
        assert_eq!(turn.turn_phase(), Phase::Idle);
        assert!(turn.turn_player().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_opponent_turn_clears_operable() {
        let turn = controller();
        turn.defrost();
        assert!(turn.operable());

        assert!(!turn.turn_changed(PlayerId::from("them")));
        assert!(!turn.operable());
        assert!(!turn.is_my_turn());
    }

    #[tokio::test(start_paused = true)]
    async fn test_own_turn_leaves_operable_alone() {
        let turn = controller();
        turn.defrost();
        assert!(turn.turn_changed(PlayerId::from("me")));
        assert!(turn.operable());

        let turn = controller();
        turn.turn_changed(PlayerId::from("me"));
        assert!(!turn.operable());
    }

    #[tokio::test(start_paused = true)]
    async fn test_freeze_preserves_remaining_time() {
        let turn = controller();
        turn.turn_changed(PlayerId::from("me"));
        tokio::time::advance(Duration::from_secs(20)).await;
        turn.freeze();
        assert_eq!(turn.turn_phase(), Phase::Paused);

        tokio::time::advance(Duration::from_secs(30)).await;
        assert_eq!(turn.turn_remaining(), Some(Duration::from_secs(40)));

        turn.defrost();
        assert!(turn.operable());
        assert_eq!(turn.turn_phase(), Phase::Running);
    }

    #[tokio::test(start_paused = true)]
    async fn test_mulligan_starts_once() {
        let turn = controller();
        assert!(turn.start_mulligan());
        tokio::time::advance(Duration::from_secs(4)).await;
        assert!(!turn.start_mulligan());
        assert_eq!(turn.mulligan_remaining(), Some(Duration::from_secs(6)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_end_turn_withdraws_operable() {
        let turn = controller();
        turn.defrost();
        turn.end_turn();
        assert!(!turn.operable());
    }
}
