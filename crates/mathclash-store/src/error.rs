//! Error types for the store layer.

use mathclash_protocol::RoomCode;

/// Errors that can occur during room persistence.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backing store cannot currently serve requests. Callers must
    /// refuse the whole operation — never degrade to partial state.
    #[error("room store is unavailable")]
    Unavailable,

    /// No live record holds this code (never stored, deleted, or
    /// expired — indistinguishable by design).
    #[error("room {0} not found")]
    NotFound(RoomCode),

    /// A live record already holds this code.
    #[error("room {0} already exists")]
    Occupied(RoomCode),

    /// A room record failed to (de)serialize. Seeing this on read means
    /// the stored JSON no longer matches the current `Room` shape.
    #[error("room record could not be serialized: {0}")]
    Codec(#[from] serde_json::Error),
}
