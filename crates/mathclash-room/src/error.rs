//! Error types for the room layer.

use mathclash_protocol::{ConnectionId, ProtocolError, RoomCode};
use mathclash_store::StoreError;

/// Errors that can occur during room operations.
///
/// The `#[error]` messages double as the user-facing text of `error`
/// events, so they name the room and stay free of internals.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// The room store is unreachable — multiplayer as a whole is off.
    /// Re-checked per request; single-player play is unaffected.
    #[error("multiplayer is currently unavailable")]
    MultiplayerUnavailable,

    /// No live room holds this code.
    #[error("room {0} not found")]
    RoomNotFound(RoomCode),

    /// The connection holds no seat in this room.
    #[error("player {0} not found in room {1}")]
    PlayerNotFound(ConnectionId, RoomCode),

    /// All six seats are taken.
    #[error("room {0} is full")]
    RoomFull(RoomCode),

    /// The connection already holds a seat in some room. One room at a
    /// time per connection.
    #[error("player {0} is already in room {1}")]
    AlreadyInRoom(ConnectionId, RoomCode),

    /// Code generation collided with live rooms on every attempt.
    /// Bounds an otherwise unbounded retry loop; in practice this means
    /// the code space is close to saturated.
    #[error("could not allocate a room code after {0} attempts")]
    CodeSpaceExhausted(u32),

    /// A non-host connection tried a host-only action.
    #[error("only the host can start the game")]
    NotHost,

    /// The host tried to start before every player was ready.
    #[error("not all players are ready")]
    PlayersNotReady,

    /// A player name was empty after trimming.
    #[error("player name must not be empty")]
    EmptyName,

    /// The supplied room code failed to parse.
    #[error(transparent)]
    Code(#[from] ProtocolError),

    /// A store failure other than unavailability or a missing room.
    #[error(transparent)]
    Store(StoreError),
}

/// The taxonomy category an error belongs to.
///
/// Collapses the concrete variants into the categories callers act on:
/// the gateway logs by kind, the HTTP surface maps kinds to status
/// codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Store unreachable; multiplayer entirely disabled.
    CapabilityUnavailable,
    /// Room or player absent.
    NotFound,
    /// Action requires a role or precondition the caller lacks.
    Forbidden,
    /// Resource contention: room full, code space exhausted.
    Conflict,
    /// Malformed input: empty name, bad room code.
    Validation,
    /// Unexpected store-level failure.
    Internal,
}

impl RoomError {
    /// Returns the taxonomy category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MultiplayerUnavailable => ErrorKind::CapabilityUnavailable,
            Self::RoomNotFound(_) | Self::PlayerNotFound(..) => {
                ErrorKind::NotFound
            }
            Self::NotHost | Self::PlayersNotReady => ErrorKind::Forbidden,
            Self::RoomFull(_)
            | Self::AlreadyInRoom(..)
            | Self::CodeSpaceExhausted(_) => ErrorKind::Conflict,
            Self::EmptyName | Self::Code(_) => ErrorKind::Validation,
            Self::Store(_) => ErrorKind::Internal,
        }
    }
}

impl From<StoreError> for RoomError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable => Self::MultiplayerUnavailable,
            StoreError::NotFound(code) => Self::RoomNotFound(code),
            other => Self::Store(other),
        }
    }
}
