//! Unified error type for the duel client.

use duel_protocol::ProtocolError;
use duel_session::SessionError;
use duel_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` conversions let `?` lift sub-crate errors directly.
#[derive(Debug, thiserror::Error)]
pub enum DuelError {
    /// A transport-level error (connect, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, invalid message).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A session-level error (request failed, not connected).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The client configuration is unusable.
    #[error("invalid configuration: {0}")]
    Config(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_transport_error() {
        let err = TransportError::ConnectionClosed("gone".into());
        let duel_err: DuelError = err.into();
        assert!(matches!(duel_err, DuelError::Transport(_)));
        assert!(duel_err.to_string().contains("gone"));
    }

    #[test]
    fn test_from_protocol_error() {
        let err = ProtocolError::InvalidMessage("bad".into());
        let duel_err: DuelError = err.into();
        assert!(matches!(duel_err, DuelError::Protocol(_)));
    }

    #[test]
    fn test_from_session_error() {
        let duel_err: DuelError = SessionError::NotConnected.into();
        assert!(matches!(duel_err, DuelError::Session(_)));
        assert_eq!(duel_err.to_string(), "not connected");
    }
}
