//! Timed, non-blocking visual effects for the duel client.
//!
//! The dispatcher triggers effects and moves on; nothing here ever makes
//! it wait. All effect state lives in one [`EffectBoard`] published
//! through a watch channel, so a renderer subscribes once and redraws on
//! every change.
//!
//! Families:
//!
//! - attack sequence ([`AttackSequence`]), timed from preparation to
//!   resolved, cancelled by `launch-cancel`
//! - turn banner ([`TurnBanner`]), visible for a fixed window that
//!   restarts on each turn change
//! - keyed marks: status-change popups, overclock glows, select rings.
//!   Several may exist per unit; each is removed individually by its
//!   [`EffectKey`], usually on a timer the triggering call site sets up
//! - card usage ([`CardUsage`]) and the unit highlight

mod attack;
mod banner;
mod board;
mod scheduler;

pub use attack::{AttackPhase, AttackSequence};
pub use banner::{TurnBanner, TurnSide};
pub use board::{
    CardUsage, EffectBoard, EffectKey, Keyed, StatusChange, UsagePosition,
};
pub use scheduler::{EffectScheduler, EffectTimings};

/// A screen-space position in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}
