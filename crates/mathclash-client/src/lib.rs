//! Client session controller for Mathclash multiplayer.
//!
//! One logical connection per controller. Room commands that expect an
//! answer ([`create_room`], [`join_room`]) resolve when the matching
//! success event arrives, reject on the server's `error` event, and
//! give up after a bounded wait. Everything else is fire-and-forget.
//!
//! Broadcast events keep a last-known room snapshot current, and
//! both connection-status transitions and raw room events are exposed
//! through subscription channels so any number of observers — a lobby
//! view, a scoreboard, a connection indicator — can react
//! independently.
//!
//! [`create_room`]: SessionController::create_room
//! [`join_room`]: SessionController::join_room

mod controller;
mod error;

pub use controller::{ConnectionStatus, SessionController};
pub use error::ClientError;
