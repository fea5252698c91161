//! Everything currently on screen, effect-wise.

use crate::{AttackSequence, TurnBanner};

/// Handle for removing one keyed effect instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EffectKey(u64);

impl EffectKey {
    pub(crate) fn new(raw: u64) -> Self {
        Self(raw)
    }
}

/// One instance of a keyed effect.
#[derive(Debug, Clone, PartialEq)]
pub struct Keyed<T> {
    pub key: EffectKey,
    pub value: T,
}

/// A stat change popup over a unit (`bp +1000`, `block`, ...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
    pub unit_id: String,
    pub kind: String,
    pub value: i64,
}

/// Where the card-usage effect appears.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsagePosition {
    /// A unit played by the local player.
    Right,
    /// A unit played by the opponent.
    Left,
    /// Anything that isn't a unit.
    Center,
}

/// A card being played, shown large for a moment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardUsage {
    pub image: String,
    pub kind: String,
    pub position: UsagePosition,
}

/// The complete effect state.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EffectBoard {
    pub attack: AttackSequence,
    pub banner: TurnBanner,
    pub status_changes: Vec<Keyed<StatusChange>>,
    /// Unit ids glowing from overclock.
    pub overclocks: Vec<Keyed<String>>,
    /// Unit ids with a spreading target ring.
    pub select_rings: Vec<Keyed<String>>,
    pub card_usage: Option<CardUsage>,
    /// The unit flagged for the effect-dialog animation.
    pub highlight: Option<String>,
    pub(crate) card_usage_generation: u64,
}

impl EffectBoard {
    /// Removes the keyed instance `key`, whichever family it belongs to.
    pub(crate) fn remove(&mut self, key: EffectKey) -> bool {
        remove_keyed(&mut self.status_changes, key)
            || remove_keyed(&mut self.overclocks, key)
            || remove_keyed(&mut self.select_rings, key)
    }

    /// Status changes currently shown on `unit_id`.
    pub fn status_changes_for<'a>(
        &'a self,
        unit_id: &'a str,
    ) -> impl Iterator<Item = &'a StatusChange> + 'a {
        self.status_changes
            .iter()
            .map(|k| &k.value)
            .filter(move |s| s.unit_id == unit_id)
    }

    /// Whether `unit_id` is glowing from overclock.
    pub fn is_overclocked(&self, unit_id: &str) -> bool {
        self.overclocks.iter().any(|k| k.value == unit_id)
    }

    /// Whether `unit_id` has a select ring.
    pub fn is_selected(&self, unit_id: &str) -> bool {
        self.select_rings.iter().any(|k| k.value == unit_id)
    }
}

fn remove_keyed<T>(list: &mut Vec<Keyed<T>>, key: EffectKey) -> bool {
    let before = list.len();
    list.retain(|k| k.key != key);
    list.len() != before
}
