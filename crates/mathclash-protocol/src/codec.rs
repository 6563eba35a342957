//! Codec trait and implementations for serializing protocol messages.
//!
//! The gateway and client don't care how messages become bytes — they
//! call through the [`Codec`] trait. [`JsonCodec`] is the only shipped
//! implementation; the browser client speaks JSON and the human-readable
//! frames make wire debugging in DevTools painless. A binary codec could
//! slot in later without touching any other layer.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// Encodes protocol values to bytes and decodes bytes back.
///
/// `Send + Sync + 'static` because the codec is shared across
/// per-connection Tokio tasks for the life of the process.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Encode`] if serialization fails.
    fn encode<T: Serialize>(
        &self,
        value: &T,
    ) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Decode`] if the bytes are malformed or
    /// don't match the expected shape.
    fn decode<T: DeserializeOwned>(
        &self,
        data: &[u8],
    ) -> Result<T, ProtocolError>;
}

/// A [`Codec`] backed by `serde_json`.
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
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

#[cfg(all(test, feature = "json"))]
mod tests {
    use super::*;
    use crate::ClientCommand;

    #[test]
    fn test_json_codec_round_trip() {
        let codec = JsonCodec;
        let cmd = ClientCommand::PlayerReady {
            room_code: "AB12CD".into(),
            ready: true,
        };

        let bytes = codec.encode(&cmd).unwrap();
        let decoded: ClientCommand = codec.decode(&bytes).unwrap();
        assert_eq!(cmd, decoded);
    }

    #[test]
    fn test_json_codec_decode_garbage_fails() {
        let codec = JsonCodec;
        let result: Result<ClientCommand, _> = codec.decode(b"\x00\x01");
        assert!(result.is_err());
    }
}
