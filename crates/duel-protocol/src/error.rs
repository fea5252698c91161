//! Error types for the protocol layer.

/// Errors raised while turning frames into envelopes and payloads, or back.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// An outgoing envelope or payload could not be serialized.
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// A frame or payload did not decode: malformed JSON, a missing
    /// `action`, or a payload whose `type` is unknown to this client.
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The frame parsed but breaks a protocol rule, e.g. a side-channel
    /// frame whose payload doesn't match its action type.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
