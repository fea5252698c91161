//! The effect scheduler: applies effect transitions and their timers.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, trace};

use crate::{
    CardUsage, EffectBoard, EffectKey, Keyed, Point, StatusChange, TurnSide,
};

/// Lifetimes of timed effects.
#[derive(Debug, Clone)]
pub struct EffectTimings {
    /// Turn banner visibility window.
    pub turn_banner: Duration,
    /// Attack preparation until the strike resolves.
    pub launch: Duration,
    /// Status-change popup lifetime.
    pub status_change: Duration,
    /// Overclock glow lifetime.
    pub overclock: Duration,
    /// Select ring lifetime.
    pub select_ring: Duration,
    /// Card-usage display time.
    pub card_usage: Duration,
}

impl Default for EffectTimings {
    fn default() -> Self {
        Self {
            turn_banner: Duration::from_millis(1800),
            launch: Duration::from_millis(600),
            status_change: Duration::from_millis(1500),
            overclock: Duration::from_secs(5),
            select_ring: Duration::from_secs(1),
            card_usage: Duration::from_secs(2),
        }
    }
}

/// Drives the [`EffectBoard`].
///
/// Every method returns immediately. Timed transitions run on spawned
/// Tokio tasks, so the scheduler must be used inside a runtime. Cheap to
/// clone; clones drive the same board.
#[derive(Debug, Clone)]
pub struct EffectScheduler {
    board: Arc<watch::Sender<EffectBoard>>,
    next_key: Arc<AtomicU64>,
    timings: EffectTimings,
}

impl Default for EffectScheduler {
    fn default() -> Self {
        Self::new(EffectTimings::default())
    }
}

impl EffectScheduler {
    pub fn new(timings: EffectTimings) -> Self {
        let (board, _) = watch::channel(EffectBoard::default());
        Self {
            board: Arc::new(board),
            next_key: Arc::new(AtomicU64::new(1)),
            timings,
        }
    }

    pub fn timings(&self) -> &EffectTimings {
        &self.timings
    }

    /// Subscribes to board changes.
    pub fn subscribe(&self) -> watch::Receiver<EffectBoard> {
        self.board.subscribe()
    }

    /// A copy of the current board.
    pub fn snapshot(&self) -> EffectBoard {
        self.board.borrow().clone()
    }

    // -- Attack sequence -------------------------------------------------

    /// Starts an attack declaration.
    pub fn declare_attack(
        &self,
        attacker_id: Option<String>,
        is_own: bool,
        origin: Point,
    ) {
        debug!(attacker = ?attacker_id, is_own, "attack declared");
        self.board
            .send_modify(|b| b.attack.declare(attacker_id, is_own, origin));
    }

    /// Marks the blocker of the current attack.
    pub fn declare_block(&self, blocker_id: String) {
        debug!(blocker = %blocker_id, "block declared");
        self.board.send_modify(|b| b.attack.declare_block(blocker_id));
    }

    /// Launches the attack at `target`. It resolves after the launch time
    /// unless cancelled first.
    pub fn launch(&self, target: Point) {
        debug!(x = target.x, y = target.y, "attack launched");
        let mut generation = 0;
        self.board.send_modify(|b| generation = b.attack.prepare(target));
        self.after(self.timings.launch, move |b| b.attack.resolve(generation));
    }

    /// Calls off the attack, whatever phase it is in.
    pub fn cancel_launch(&self) {
        debug!("attack cancelled");
        self.board.send_modify(|b| b.attack.cancel());
    }

    // -- Turn banner -----------------------------------------------------

    /// Shows the turn banner, restarting its window if already visible.
    pub fn show_turn_banner(&self, side: TurnSide) {
        debug!(?side, "turn banner shown");
        let mut generation = 0;
        self.board.send_modify(|b| generation = b.banner.show(side));
        self.after(self.timings.turn_banner, move |b| b.banner.hide(generation));
    }

    // -- Keyed marks -----------------------------------------------------

    /// Adds a status-change popup. Stays until removed by key.
    pub fn add_status_change(
        &self,
        unit_id: &str,
        kind: &str,
        value: i64,
    ) -> EffectKey {
        let change = StatusChange {
            unit_id: unit_id.to_string(),
            kind: kind.to_string(),
            value,
        };
        trace!(unit = unit_id, kind, value, "status change added");
        self.insert(|b, key| b.status_changes.push(Keyed { key, value: change }))
    }

    /// Adds an overclock glow on `unit_id`. Stays until removed by key.
    pub fn add_overclock(&self, unit_id: &str) -> EffectKey {
        let unit = unit_id.to_string();
        trace!(unit = unit_id, "overclock added");
        self.insert(|b, key| b.overclocks.push(Keyed { key, value: unit }))
    }

    /// Adds a select ring on `unit_id`. Stays until removed by key.
    pub fn add_select_ring(&self, unit_id: &str) -> EffectKey {
        let unit = unit_id.to_string();
        trace!(unit = unit_id, "select ring added");
        self.insert(|b, key| b.select_rings.push(Keyed { key, value: unit }))
    }

    /// Removes one keyed instance now.
    pub fn remove(&self, key: EffectKey) -> bool {
        self.board.send_if_modified(|b| b.remove(key))
    }

    /// Removes one keyed instance after `delay`.
    pub fn remove_after(&self, key: EffectKey, delay: Duration) {
        self.after(delay, move |b| b.remove(key));
    }

    // -- Card usage and highlight ----------------------------------------

    /// Shows a played card for the card-usage time.
    pub fn show_card_usage(&self, usage: CardUsage) {
        debug!(kind = %usage.kind, position = ?usage.position, "card usage shown");
        let mut generation = 0;
        self.board.send_modify(|b| {
            b.card_usage = Some(usage);
            b.card_usage_generation += 1;
            generation = b.card_usage_generation;
        });
        self.after(self.timings.card_usage, move |b| {
            if b.card_usage_generation == generation && b.card_usage.is_some() {
                b.card_usage = None;
                true
            } else {
                false
            }
        });
    }

    /// Flags (or with `None`, unflags) a unit for the effect animation.
    pub fn highlight_unit(&self, unit_id: Option<String>) {
        self.board.send_if_modified(|b| {
            if b.highlight == unit_id {
                return false;
            }
            b.highlight = unit_id;
            true
        });
    }

    fn insert(&self, add: impl FnOnce(&mut EffectBoard, EffectKey)) -> EffectKey {
        let key = EffectKey::new(self.next_key.fetch_add(1, Ordering::Relaxed));
        self.board.send_modify(|b| add(b, key));
        key
    }

    /// Applies `change` after `delay`; `change` reports whether it did
    /// anything, so stale timers don't wake subscribers.
    fn after(
        &self,
        delay: Duration,
        change: impl FnOnce(&mut EffectBoard) -> bool + Send + 'static,
    ) {
        let board = Arc::clone(&self.board);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            board.send_if_modified(change);
        });
    }
}
