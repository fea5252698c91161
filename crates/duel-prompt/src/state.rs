//! The pure prompt state machine.

use std::fmt;

use duel_protocol::PromptId;
use tokio::time::Instant;

/// The prompt families the client answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromptKind {
    /// Option panel.
    Option,
    /// Card multi-select dialog.
    Card,
    /// Target unit selection.
    Unit,
    /// Blocker selection.
    Block,
    /// Intercept card selection.
    Intercept,
    /// Acknowledgement of a displayed card effect.
    Effect,
}

impl PromptKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Option => "option",
            Self::Card => "card",
            Self::Unit => "unit",
            Self::Block => "block",
            Self::Intercept => "intercept",
            Self::Effect => "effect",
        }
    }
}

impl fmt::Display for PromptKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a prompt ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The player chose these ids (possibly none).
    Selected(Vec<String>),
    /// The deadline passed first.
    TimedOut,
    /// Withdrawn: superseded by a newer prompt, closed, or made moot by
    /// the server.
    Cancelled,
}

impl Outcome {
    /// The ids to send back. Timeouts and cancellations answer with an
    /// empty choice.
    pub fn into_choice(self) -> Vec<String> {
        match self {
            Self::Selected(ids) => ids,
            Self::TimedOut | Self::Cancelled => Vec::new(),
        }
    }

    pub fn is_selected(&self) -> bool {
        matches!(self, Self::Selected(_))
    }
}

/// Where one prompt slot stands.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PromptState {
    /// Nothing shown.
    #[default]
    Idle,
    /// Waiting on the player.
    Pending {
        id: PromptId,
        deadline: Option<Instant>,
    },
    /// The last prompt's final result.
    Resolved { id: PromptId, outcome: Outcome },
}

impl PromptState {
    /// The id of the prompt being waited on.
    pub fn pending_id(&self) -> Option<&PromptId> {
        match self {
            Self::Pending { id, .. } => Some(id),
            Self::Idle | Self::Resolved { .. } => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending { .. })
    }
}

/// Inputs to [`reduce`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptEvent {
    /// A new prompt is shown.
    Open {
        id: PromptId,
        deadline: Option<Instant>,
    },
    /// The player chose, for prompt `id`.
    Select { id: PromptId, choice: Vec<String> },
    /// The deadline for prompt `id` passed.
    Expire { id: PromptId },
    /// Withdraw the pending prompt; `None` matches whichever is pending.
    Cancel { id: Option<PromptId> },
}

/// Result of one transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub state: PromptState,
    /// Set when this transition resolved a prompt.
    pub resolved: Option<(PromptId, Outcome)>,
}

impl Step {
    fn unchanged(state: PromptState) -> Self {
        Self {
            state,
            resolved: None,
        }
    }

    fn resolve(id: PromptId, outcome: Outcome) -> Self {
        Self {
            state: PromptState::Resolved {
                id: id.clone(),
                outcome: outcome.clone(),
            },
            resolved: Some((id, outcome)),
        }
    }
}

/// Applies `event` to `state`.
///
/// Only a pending prompt can resolve, and only through an event naming
/// that prompt. Everything else leaves the state as it was, which is what
/// makes a second resolution attempt a no-op.
pub fn reduce(state: PromptState, event: PromptEvent) -> Step {
    match (state, event) {
        (PromptState::Pending { id: previous, .. }, PromptEvent::Open { id, deadline }) => {
            Step {
                state: PromptState::Pending { id, deadline },
                resolved: Some((previous, Outcome::Cancelled)),
            }
        }
        (_, PromptEvent::Open { id, deadline }) => {
            Step::unchanged(PromptState::Pending { id, deadline })
        }
        (PromptState::Pending { id, deadline }, PromptEvent::Select { id: target, choice }) => {
            if id == target {
                Step::resolve(id, Outcome::Selected(choice))
            } else {
                Step::unchanged(PromptState::Pending { id, deadline })
            }
        }
        (PromptState::Pending { id, deadline }, PromptEvent::Expire { id: target }) => {
            if id == target {
                Step::resolve(id, Outcome::TimedOut)
            } else {
                Step::unchanged(PromptState::Pending { id, deadline })
            }
        }
        (PromptState::Pending { id, deadline }, PromptEvent::Cancel { id: target }) => {
            if target.as_ref().is_none_or(|t| *t == id) {
                Step::resolve(id, Outcome::Cancelled)
            } else {
                Step::unchanged(PromptState::Pending { id, deadline })
            }
        }
        (state, _) => Step::unchanged(state),
    }
}
