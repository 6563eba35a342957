//! Error types for the client session controller.

use mathclash_protocol::ProtocolError;

/// Errors surfaced by [`SessionController`](crate::SessionController)
/// operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// No live connection; connect (or reconnect) first.
    #[error("not connected to the server")]
    NotConnected,

    /// The server didn't answer within the bounded wait. Advisory only:
    /// the server may still process the command — the timeout cancels
    /// nothing remotely.
    #[error("{0} timed out waiting for the server")]
    Timeout(&'static str),

    /// A request of the same kind is still waiting for its answer.
    #[error("another {0} request is already pending")]
    RequestInFlight(&'static str),

    /// The connection ended before the server replied.
    #[error("connection closed before the server replied")]
    ConnectionClosed,

    /// The server answered with an `error` event.
    #[error("server rejected the request: {0}")]
    Rejected(String),

    /// The underlying WebSocket failed.
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// A message failed to encode or decode.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}
