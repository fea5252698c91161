//! Error types for the session layer.

use std::time::Duration;

use duel_protocol::ProtocolError;
use duel_transport::TransportError;

/// Errors returned by [`Channel::request`](crate::Channel::request).
///
/// Plain sends never return an error: a send on a closed channel is a
/// logged no-op.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The channel is not open.
    #[error("not connected")]
    NotConnected,

    /// The connection closed before a response arrived.
    #[error("connection closed while a request was pending")]
    Closed,

    /// A frame that could not be parsed arrived while waiting.
    #[error("malformed frame while waiting for a response: {0}")]
    Malformed(String),

    /// No response arrived within the configured timeout.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// The transport failed to send the request.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The request could not be encoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}
