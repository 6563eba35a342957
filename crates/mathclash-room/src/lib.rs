//! Room lifecycle management for Mathclash.
//!
//! This crate owns the business rules of multiplayer rooms: who may
//! create, join, and leave; how readiness gates a round; who is allowed
//! to start one. It holds no state of its own — every operation is a
//! transform applied atomically through the injected [`RoomStore`],
//! so two gateways (or two racing commands) can never lose each
//! other's updates.
//!
//! # Key types
//!
//! - [`RoomManager`] — the operations, generic over the store
//! - [`RoomPhase`] — the derived lifecycle state of a room
//! - [`RoomError`] / [`ErrorKind`] — failure taxonomy
//!
//! [`RoomStore`]: mathclash_store::RoomStore

mod error;
mod manager;
mod phase;

pub use error::{ErrorKind, RoomError};
pub use manager::{
    MAX_CODE_ATTEMPTS, MAX_PLAYERS, ReadyUpdate, Removal, RoomManager,
    generate_code,
};
pub use phase::{RoomPhase, all_players_ready, phase};
