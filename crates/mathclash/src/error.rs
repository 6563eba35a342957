//! Unified error type for the Mathclash server.

use mathclash_protocol::ProtocolError;
use mathclash_room::RoomError;
use mathclash_store::StoreError;
use mathclash_transport::TransportError;

/// Top-level error that wraps all layer-specific errors.
///
/// Users of the `mathclash` server crate deal with this single type;
/// the `#[from]` attributes let `?` convert layer errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// A transport-level error (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, bad room code).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A room-level error (not found, full, forbidden, …).
    #[error(transparent)]
    Room(#[from] RoomError),

    /// A store-level error outside a room operation.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The HTTP surface failed to bind or serve.
    #[error("http surface error: {0}")]
    Http(#[from] std::io::Error),
}
