//! The collaborator interface the client core drives.
//!
//! A [`Frontend`] renders prompts and plays cues. It never blocks: every
//! prompt method receives a [`PromptResponder`] and returns at once; the
//! frontend answers later through the responder (or never, in which case
//! the prompt's deadline answers for it).

use duel_effects::Point;
use duel_prompt::PromptResponder;
use duel_protocol::{CardRef, OptionItem, PlayerId, SoundId, UnitRef};

/// A card effect to show in a modal dialog until acknowledged.
#[derive(Debug, Clone, PartialEq)]
pub struct EffectDialog {
    pub title: String,
    pub message: String,
    pub unit_id: Option<String>,
}

/// One option on the option panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelOption {
    pub id: String,
    pub label: String,
    pub enabled: bool,
}

impl From<OptionItem> for PanelOption {
    fn from(item: OptionItem) -> Self {
        Self {
            id: item.id,
            label: item.description,
            enabled: true,
        }
    }
}

/// The option panel.
#[derive(Debug, Clone, PartialEq)]
pub struct OptionPanel {
    pub title: String,
    pub options: Vec<PanelOption>,
    /// The player the choice belongs to.
    pub player: PlayerId,
    /// Whether that player is the local one. The panel is shown either
    /// way; the opponent's panel is informational.
    pub is_mine: bool,
    pub time_limit: std::time::Duration,
}

/// A card multi-select dialog.
#[derive(Debug, Clone, PartialEq)]
pub struct CardSelector {
    pub title: String,
    pub items: Vec<CardRef>,
    /// How many cards to pick.
    pub count: usize,
    pub time_limit: std::time::Duration,
}

/// Intercept cards the player may activate, or decline.
#[derive(Debug, Clone, PartialEq)]
pub struct InterceptOffer {
    pub title: Option<String>,
    pub items: Vec<CardRef>,
}

/// What picking a unit means.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionMode {
    Target,
    Block,
}

/// Units the player may pick from.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitSelection {
    pub title: Option<String>,
    pub items: Vec<UnitRef>,
    pub mode: SelectionMode,
    /// Whether the player may back out without picking.
    pub is_cancelable: bool,
}

/// Rendering and input, as seen from the client core.
///
/// Every method has a no-op default, so a frontend implements only what it
/// renders. Prompts left unanswered resolve on their deadline.
pub trait Frontend: Send + Sync + 'static {
    /// Current screen position of a unit's center, if it is on screen.
    fn unit_position(&self, _unit_id: &str) -> Option<Point> {
        None
    }

    fn play_sound(&self, _sound: &SoundId) {}

    fn show_mulligan(&self) {}

    /// Shows a card effect. Acknowledge with `responder.select(vec![])`.
    fn show_effect_dialog(&self, _dialog: EffectDialog, _responder: PromptResponder) {}

    fn show_options(&self, _panel: OptionPanel, _responder: PromptResponder) {}

    fn clear_options(&self) {}

    fn open_card_selector(&self, _selector: CardSelector, _responder: PromptResponder) {}

    fn close_card_dialog(&self) {}

    fn offer_intercepts(&self, _offer: InterceptOffer, _responder: PromptResponder) {}

    fn clear_intercepts(&self) {}

    fn select_unit(&self, _selection: UnitSelection, _responder: PromptResponder) {}

    fn clear_unit_selection(&self) {}
}

/// Renders nothing; every prompt runs to its deadline.
#[derive(Debug, Clone, Copy, Default)]
pub struct Headless;

impl Frontend for Headless {}
