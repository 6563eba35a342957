//! Error types for the protocol layer.
//!
//! Each crate in Mathclash defines its own error enum. A `ProtocolError`
//! always means the problem is in message shape or serialization, not in
//! networking or room management.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into bytes).
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed (turning bytes into a Rust type).
    ///
    /// Common causes: malformed JSON, missing required fields, or an
    /// event name the protocol doesn't know.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The given string is not a valid room code.
    ///
    /// Room codes are exactly six characters from `[A-Z0-9]`. Parsing
    /// normalizes case and whitespace first, so `" ab12cd "` is accepted
    /// (as `AB12CD`) but `"AB12"` and `"AB-2CD"` are not.
    #[error("invalid room code: {0:?}")]
    InvalidRoomCode(String),
}
