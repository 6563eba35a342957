//! Transport layer for Mathclash.
//!
//! Owns the WebSocket listener and the per-connection plumbing: frame
//! normalization (text and binary both arrive as bytes), connection
//! identity, and the split into independent send/receive halves.
//!
//! The split matters: the gateway broadcasts to a connection from one
//! task while another task sits in `recv()` waiting for the client's
//! next command. Owned halves let both proceed without a shared lock
//! serializing them.
//!
//! This crate knows nothing about the event protocol — it moves bytes.

mod error;
mod websocket;

pub use error::TransportError;
pub use websocket::{WsConnection, WsListener, WsReceiver, WsSender};
