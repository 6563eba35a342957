//! Wire protocol for Mathclash.
//!
//! This crate defines the "language" that quiz clients and the room server
//! speak:
//!
//! - **Types** ([`Room`], [`Player`], [`ClientCommand`], [`ServerEvent`]) —
//!   the structures that travel on the wire and persist in the room store.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]) — how those messages are
//!   converted to/from bytes.
//! - **Errors** ([`ProtocolError`]) — what can go wrong while doing so.
//!
//! # Architecture
//!
//! The protocol layer sits between transport (raw frames) and the room
//! layer (lifecycle rules). It doesn't know about connections, broadcast
//! groups, or readiness semantics — it only knows message shapes.
//!
//! ```text
//! Transport (bytes) → Protocol (commands/events) → Room (lifecycle rules)
//! ```
//!
//! Every event name and payload field spelling matches what the browser
//! client sends: kebab-case event names, camelCase data fields.

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{
    ClientCommand, ConnectionId, Player, Room, RoomCode, ServerEvent,
};
