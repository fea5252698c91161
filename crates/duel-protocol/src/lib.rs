//! Wire protocol for the duel client.
//!
//! This crate defines the messages the client and the game server
//! exchange:
//!
//! - **Envelope** ([`Message`], [`Action`], [`RawMessage`]): every frame is
//!   `{ action: { handler, type }, payload }`.
//! - **Push payloads** ([`Push`], [`Choices`], [`VisualEffect`]): what the
//!   server sends unsolicited during a match.
//! - **Outgoing payloads** ([`ClientPayload`]): replies to prompts, turn
//!   end, and debug commands.
//! - **Side channel** ([`ErrorPayload`], [`DisconnectedPayload`],
//!   [`ReconnectedPayload`], [`ErrorCode`]): out-of-band notices.
//! - **Codec** ([`Codec`], [`JsonCodec`]): how messages become bytes.
//!
//! ```text
//! Transport (bytes) → Protocol (Message) → Session (channel, signals)
//! ```

mod codec;
mod error;
mod error_code;
mod types;

pub use codec::{Codec, JsonCodec};
pub use error::ProtocolError;
pub use error_code::{ErrorCategory, ErrorCode};
pub use types::{
    Action, CardRef, Choices, ClientPayload, DisconnectedPayload,
    ErrorPayload, Message, OperationAction, OptionItem, PlayerId, PromptHeader,
    PromptId, Push, RawMessage, ReconnectedPayload, Snapshot, SoundId, UnitRef,
    VisualEffect,
};
