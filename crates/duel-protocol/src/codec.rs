//! Codec trait and the JSON implementation.
//!
//! The session layer doesn't care how messages become bytes; it holds
//! something that implements [`Codec`]. The server speaks JSON, so
//! [`JsonCodec`] is the only implementation today.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// A codec that can encode Rust types to bytes and decode bytes back.
///
/// `Send + Sync + 'static` because the codec is shared between the reader
/// task and every sender.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode<T: Serialize>(
        &self,
        value: &T,
    ) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed,
    /// incomplete, or don't match the expected type.
    fn decode<T: DeserializeOwned>(
        &self,
        data: &[u8],
    ) -> Result<T, ProtocolError>;
}

/// A [`Codec`] that uses JSON (via `serde_json`).
///
/// ## Example
///
/// ```rust
/// use duel_protocol::{Codec, JsonCodec, Message, Push, SoundId};
///
/// let codec = JsonCodec;
/// let msg = Message::push(Push::SoundEffect { sound_id: SoundId::from("draw") });
///
/// let bytes = codec.encode(&msg).unwrap();
/// let decoded: Message<Push> = codec.decode(&bytes).unwrap();
/// assert_eq!(msg, decoded);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode<T: Serialize>(
        &self,
        value: &T,
    ) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(
        &self,
        data: &[u8],
    ) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Action, RawMessage};

    #[test]
    fn test_decode_rejects_malformed_json() {
        let err = JsonCodec.decode::<RawMessage>(b"{not json").unwrap_err();
        assert!(matches!(err, ProtocolError::Decode(_)));
        assert!(err.to_string().starts_with("decode failed"));
    }

    #[test]
    fn test_decode_rejects_missing_action() {
        let err = JsonCodec
            .decode::<RawMessage>(br#"{"payload":{}}"#)
            .unwrap_err();
        assert!(matches!(err, ProtocolError::Decode(_)));
    }

    #[test]
    fn test_encode_produces_wire_shape() {
        let msg = RawMessage {
            action: Action::new("core", "event"),
            payload: serde_json::json!({ "type": "TurnEnd" }),
        };
        let bytes = JsonCodec.encode(&msg).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["action"]["handler"], "core");
        assert_eq!(value["action"]["type"], "event");
        assert_eq!(value["payload"]["type"], "TurnEnd");
    }
}
