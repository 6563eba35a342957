//! # Mathclash
//!
//! Real-time multiplayer backend for the Mathclash arithmetic quiz game.
//!
//! The server ties the layers together: transport (WebSocket accept
//! loop) → protocol (event decoding) → room (lifecycle rules) → store
//! (persistence with TTL). Each accepted connection gets its own task
//! that dispatches commands to the [`RoomManager`] and fans resulting
//! events out to the room's broadcast group. A small axum surface
//! exposes `/api/status` and `/api/rooms/{code}` for ops and debugging.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use mathclash::ServerBuilder;
//!
//! # async fn run() -> Result<(), mathclash::GatewayError> {
//! let server = ServerBuilder::new()
//!     .bind("0.0.0.0:8090")
//!     .http_bind("0.0.0.0:8091")
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```
//!
//! [`RoomManager`]: mathclash_room::RoomManager

mod error;
mod gateway;
mod http;
mod server;

pub use error::GatewayError;
pub use server::{Server, ServerBuilder};
