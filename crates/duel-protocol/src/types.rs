//! Core protocol types for the wire format.
//!
//! Every frame is a [`Message`]: an [`Action`] routing header plus a JSON
//! payload. The payload shape depends on direction:
//!
//! - server pushes decode into [`Push`]
//! - client sends are built from [`ClientPayload`]
//! - side-channel notices decode into [`ErrorPayload`],
//!   [`DisconnectedPayload`] and [`ReconnectedPayload`]
//!
//! Field names on the wire are camelCase; Rust names are snake_case.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{ErrorCode, ProtocolError};

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord,
            Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Returns the id as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    };
}

string_id!(
    /// A player's identity as assigned by the server.
    ///
    /// Unit ids are prefixed with their owner's player id, which is how the
    /// client tells its own units from the opponent's.
    PlayerId
);

string_id!(
    /// Identifies one server prompt. Every reply must echo it.
    PromptId
);

string_id!(
    /// Name of a sound cue (`"effect"`, `"turnchange"`, ...).
    SoundId
);

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// Routing header of a frame: which server handler and which action.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Action {
    pub handler: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl Action {
    pub fn new(handler: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            handler: handler.into(),
            kind: kind.into(),
        }
    }

    /// Header used for unsolicited server pushes. The client routes pushes
    /// by payload type, so the header is informational only.
    pub fn push() -> Self {
        Self::new("client", "push")
    }

    /// `core/event`: in-game actions such as ending the turn.
    pub fn core_event() -> Self {
        Self::new("core", "event")
    }

    /// `core/debug`: debug commands.
    pub fn core_debug() -> Self {
        Self::new("core", "debug")
    }

    /// `core/response`: replies to prompts.
    pub fn core_response() -> Self {
        Self::new("core", "response")
    }
}

/// Action types delivered out of band, ahead of the game stream.
pub(crate) const SIDE_CHANNEL_KINDS: [&str; 3] =
    ["error", "disconnected", "reconnected"];

/// One frame on the wire.
///
/// The payload type defaults to raw JSON ([`RawMessage`]); the session
/// layer classifies a frame before committing to a typed payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message<P = Value> {
    pub action: Action,
    pub payload: P,
}

/// A frame whose payload has not been interpreted yet.
pub type RawMessage = Message<Value>;

impl Message<Push> {
    /// Wraps a push payload in the push header.
    pub fn push(payload: Push) -> Self {
        Self {
            action: Action::push(),
            payload,
        }
    }
}

impl Message<ClientPayload> {
    /// Wraps an outgoing payload in the header the server expects for it.
    pub fn outgoing(payload: ClientPayload) -> Self {
        Self {
            action: payload.action(),
            payload,
        }
    }
}

impl<P: Serialize> Message<P> {
    /// Converts a typed message into its raw JSON form.
    pub fn to_raw(&self) -> Result<RawMessage, ProtocolError> {
        Ok(RawMessage {
            action: self.action.clone(),
            payload: serde_json::to_value(&self.payload)
                .map_err(ProtocolError::Encode)?,
        })
    }
}

impl RawMessage {
    /// The action type (`action.type`).
    pub fn kind(&self) -> &str {
        &self.action.kind
    }

    /// Whether this frame belongs to the side channel (`error`,
    /// `disconnected`, `reconnected`).
    pub fn is_side_channel(&self) -> bool {
        SIDE_CHANNEL_KINDS.contains(&self.kind())
    }

    /// Whether the payload is response-shaped, i.e. carries a `requestId`.
    pub fn is_response(&self) -> bool {
        self.payload.get("requestId").is_some()
    }

    /// The `requestId` of a response, when it is a string.
    pub fn request_id(&self) -> Option<&str> {
        self.payload.get("requestId").and_then(Value::as_str)
    }

    /// The addressing of a `Choices` push, read without the prompt body.
    ///
    /// Lets a client answer a prompt whose family it doesn't know. Returns
    /// `None` for other payloads or when the header itself is unreadable.
    pub fn prompt_header(&self) -> Option<PromptHeader> {
        if self.payload.get("type").and_then(Value::as_str) != Some("Choices") {
            return None;
        }
        self.decode_payload().ok()
    }

    /// Interprets the payload as `T`.
    pub fn decode_payload<T: DeserializeOwned>(
        &self,
    ) -> Result<T, ProtocolError> {
        T::deserialize(&self.payload).map_err(ProtocolError::Decode)
    }
}

/// Who a prompt is for and how to answer it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptHeader {
    pub prompt_id: PromptId,
    pub player: PlayerId,
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// The full authoritative game state delivered by `Sync`.
///
/// The client never merges snapshots: each `Sync` replaces the previous
/// one wholesale, so the structure is kept as opaque JSON with a few
/// read-only queries on top.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot(pub Value);

impl Snapshot {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Player ids present in the snapshot.
    pub fn player_ids(&self) -> Vec<&str> {
        self.0
            .get("players")
            .and_then(Value::as_object)
            .map(|players| players.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Ids of the units on `player`'s field.
    pub fn field_unit_ids(&self, player: &PlayerId) -> Vec<&str> {
        self.0
            .get("players")
            .and_then(|players| players.get(player.as_str()))
            .and_then(|p| p.get("field"))
            .and_then(Value::as_array)
            .map(|field| {
                field
                    .iter()
                    .filter_map(|unit| unit.get("id").and_then(Value::as_str))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Whether `unit_id` is on `player`'s field.
    pub fn field_contains(&self, player: &PlayerId, unit_id: &str) -> bool {
        self.field_unit_ids(player).contains(&unit_id)
    }

    /// The current turn number (`game.turn`), if present.
    pub fn turn(&self) -> Option<u64> {
        self.0
            .get("game")
            .and_then(|g| g.get("turn"))
            .and_then(Value::as_u64)
    }
}

// ---------------------------------------------------------------------------
// Prompt items
// ---------------------------------------------------------------------------

/// One entry of an option prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionItem {
    pub id: String,
    pub description: String,
}

/// A card offered for selection. Only the id matters to the client core;
/// everything else is carried through for the renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardRef {
    pub id: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A unit offered as a target or blocker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitRef {
    pub id: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The body of a `Choices` push, tagged by prompt family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum Choices {
    /// Pick one of several described options.
    Option {
        #[serde(default)]
        title: String,
        items: Vec<OptionItem>,
    },
    /// Pick `count` cards.
    Card {
        #[serde(default)]
        title: String,
        items: Vec<CardRef>,
        count: usize,
    },
    /// Activate one intercept card, or none.
    Intercept {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
        items: Vec<CardRef>,
    },
    /// Pick a target unit.
    Unit {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
        items: Vec<UnitRef>,
        #[serde(default)]
        is_cancelable: bool,
    },
    /// Pick a blocking unit.
    Block {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
        items: Vec<UnitRef>,
        #[serde(default)]
        is_cancelable: bool,
    },
}

impl Choices {
    /// Lower-case family name, as on the wire.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Option { .. } => "option",
            Self::Card { .. } => "card",
            Self::Intercept { .. } => "intercept",
            Self::Unit { .. } => "unit",
            Self::Block { .. } => "block",
        }
    }
}

// ---------------------------------------------------------------------------
// Visual effects
// ---------------------------------------------------------------------------

/// The body of a `VisualEffect` push, tagged by `effect`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "effect",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum VisualEffect {
    /// Attack declaration.
    Attack {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        attacker_id: Option<String>,
    },
    /// Block declaration.
    Block {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        blocker_id: Option<String>,
    },
    /// The attack launches at a blocker, or at the defending player when
    /// there is no blocker.
    Launch {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        attacker_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        blocker_id: Option<String>,
    },
    /// A stat change popup on a unit.
    Status {
        unit_id: String,
        #[serde(rename = "type")]
        kind: String,
        value: i64,
    },
    /// A card was played ("driven").
    Drive {
        #[serde(rename = "type")]
        kind: String,
        player: PlayerId,
        image: String,
    },
    /// The pending attack was cancelled.
    LaunchCancel {},
    /// A unit was chosen as a target.
    Select { unit_id: String },
    /// A unit entered overclock.
    Overclock { unit_id: String },
    /// An effect this client doesn't render.
    #[serde(other)]
    Unknown,
}

// ---------------------------------------------------------------------------
// Push: server to client game messages
// ---------------------------------------------------------------------------

/// `freeze` / `defrost` of the local player's controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationAction {
    Freeze,
    Defrost,
}

/// An unsolicited server message, tagged by payload `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum Push {
    /// Full state replacement.
    Sync { body: Snapshot },

    /// The mulligan phase begins.
    MulliganStart {},

    /// A card effect is being resolved; the client shows it and replies
    /// with `Continue` once the player acknowledges.
    DisplayEffect {
        prompt_id: PromptId,
        #[serde(default)]
        title: String,
        #[serde(default)]
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        unit_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        player: Option<PlayerId>,
    },

    /// The server asks `player` to choose.
    Choices {
        prompt_id: PromptId,
        player: PlayerId,
        choices: Choices,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        deadline_seconds: Option<u64>,
    },

    /// The open option panel became moot.
    Selected {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        prompt_id: Option<PromptId>,
    },

    /// Play a sound cue.
    SoundEffect { sound_id: SoundId },

    /// Play a visual effect.
    VisualEffect { body: VisualEffect },

    /// The turn passed to `player`.
    TurnChange { player: PlayerId, is_first: bool },

    /// Freeze or defrost the local player's controls.
    Operation { action: OperationAction },

    /// A payload type this client doesn't handle.
    #[serde(other)]
    Unknown,
}

impl Push {
    /// Payload type name, for logging.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Sync { .. } => "Sync",
            Self::MulliganStart {} => "MulliganStart",
            Self::DisplayEffect { .. } => "DisplayEffect",
            Self::Choices { .. } => "Choices",
            Self::Selected { .. } => "Selected",
            Self::SoundEffect { .. } => "SoundEffect",
            Self::VisualEffect { .. } => "VisualEffect",
            Self::TurnChange { .. } => "TurnChange",
            Self::Operation { .. } => "Operation",
            Self::Unknown => "Unknown",
        }
    }

    /// Whether handling this message waits on the player.
    pub fn awaits_player(&self) -> bool {
        matches!(self, Self::DisplayEffect { .. } | Self::Choices { .. })
    }
}

// ---------------------------------------------------------------------------
// ClientPayload: client to server
// ---------------------------------------------------------------------------

/// A message the client sends to the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum ClientPayload {
    /// Terminal reply to a `Choices` prompt. An empty `choice` means
    /// nothing was picked (timeout or cancel).
    Choose {
        player: PlayerId,
        prompt_id: PromptId,
        choice: Vec<String>,
    },
    /// Acknowledges a `DisplayEffect`.
    Continue {
        player: PlayerId,
        prompt_id: PromptId,
    },
    /// Ends the local player's turn.
    TurnEnd { player: PlayerId },
    /// Debug: draw a card.
    DebugDraw { player: PlayerId },
    /// Debug: put a catalog card into the hand.
    DebugMake { player: PlayerId, catalog_id: String },
    /// Debug: play a catalog card directly.
    DebugDrive { player: PlayerId, catalog_id: String },
}

impl ClientPayload {
    /// The routing header the server expects for this payload.
    pub fn action(&self) -> Action {
        match self {
            Self::Choose { .. } | Self::Continue { .. } => {
                Action::core_response()
            }
            Self::TurnEnd { .. } => Action::core_event(),
            Self::DebugDraw { .. }
            | Self::DebugMake { .. }
            | Self::DebugDrive { .. } => Action::core_debug(),
        }
    }
}

// ---------------------------------------------------------------------------
// Side channel
// ---------------------------------------------------------------------------

/// Payload of an `error` frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorPayload {
    pub error_code: ErrorCode,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

/// Payload of a `disconnected` frame: the opponent dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisconnectedPayload {
    /// `true` when the server is tearing the room down; the session is
    /// over. `false` when the server waits for the opponent to return.
    pub room_will_close: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player: Option<PlayerId>,
}

/// Payload of a `reconnected` frame: the opponent is back.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconnectedPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player: Option<PlayerId>,
}

// =========================================================================
// Tests
// =========================================================================
