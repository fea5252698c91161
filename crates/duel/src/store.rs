//! The game snapshot store.

use std::sync::Arc;

use duel_protocol::Snapshot;
use tokio::sync::watch;
use tracing::debug;

/// Holds the latest snapshot received via `Sync`.
///
/// Every `Sync` replaces the whole snapshot; nothing is merged. Readers
/// get an `Arc` to the snapshot current at that instant, and subscribers
/// are woken once per replacement.
#[derive(Debug, Clone)]
pub struct GameStore {
    current: Arc<watch::Sender<Option<Arc<Snapshot>>>>,
}

impl Default for GameStore {
    fn default() -> Self {
        Self::new()
    }
}

impl GameStore {
    pub fn new() -> Self {
        let (current, _) = watch::channel(None);
        Self {
            current: Arc::new(current),
        }
    }

    /// Replaces the snapshot wholesale.
    pub fn replace(&self, snapshot: Snapshot) -> Arc<Snapshot> {
        let snapshot = Arc::new(snapshot);
        debug!(turn = ?snapshot.turn(), "snapshot replaced");
        self.current.send_replace(Some(Arc::clone(&snapshot)));
        snapshot
    }

    /// The latest snapshot, or `None` before the first `Sync`.
    pub fn current(&self) -> Option<Arc<Snapshot>> {
        self.current.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<Snapshot>>> {
        self.current.subscribe()
    }
}
