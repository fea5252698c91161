//! Message-level session for the duel client.
//!
//! This crate sits between the byte transport and the game dispatcher:
//!
//! 1. **Channel** ([`Channel`]): fire-and-forget [`send`](Channel::send),
//!    correlated [`request`](Channel::request), and a stream of
//!    [`Signal`]s (`Open`, `Message`, `Close`).
//! 2. **Side channel** ([`SideChannel`]): `error`, `disconnected` and
//!    `reconnected` frames are intercepted before the game stream and
//!    routed to registered handlers, falling back to a synchronous
//!    notification when none is registered.
//! 3. **Connection state** ([`ConnectionState`]): `Open`, `Closed`, or
//!    waiting for the opponent to reconnect, observable through a watch
//!    channel.
//!
//! # How it fits in the stack
//!
//! ```text
//! Dispatcher (above)  ← consumes Signal::Message, sends replies
//!     ↕
//! Session Layer (this crate)  ← classification, correlation, notices
//!     ↕
//! Transport + Protocol (below)  ← bytes and message types
//! ```

mod channel;
mod error;
mod notice;
mod pending;

pub use channel::{Channel, ChannelConfig, Signal};
pub use error::SessionError;
pub use notice::{
    ConnectionState, Navigator, Notice, SideChannel, SideChannelConfig,
};
