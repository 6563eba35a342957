//! Room persistence for Mathclash.
//!
//! One record per room, keyed by `room:<CODE>`, value = the JSON-serialized
//! [`Room`], expiring after a fixed time-to-live that every write re-arms.
//! Abandoned rooms thus vanish on their own; active rooms live as long as
//! anyone keeps mutating them.
//!
//! # Key types
//!
//! - [`RoomStore`] — the trait the room layer depends on
//! - [`MemoryStore`] — the in-process implementation
//! - [`StoreError`] — what can go wrong at this layer
//!
//! # Capability, not fallback
//!
//! Multiplayer is all-or-nothing: when the backing store is unavailable,
//! every operation fails with [`StoreError::Unavailable`] and the layers
//! above surface that as a capability error. There is no silent in-memory
//! fallback — two clients on an inconsistent store would see different
//! rooms, which is worse than no multiplayer at all.

#![allow(async_fn_in_trait)]

mod error;
mod memory;

pub use error::StoreError;
pub use memory::MemoryStore;

use std::future::Future;
use std::time::Duration;

use mathclash_protocol::{Room, RoomCode};

/// How long a room record lives without a write, per the wire contract
/// (1800 seconds).
pub const ROOM_TTL: Duration = Duration::from_secs(1800);

/// Keyed room persistence with per-key atomic primitives.
///
/// All mutating operations re-arm the record's TTL. `insert` and `update`
/// are the concurrency primitives: both perform their check-then-write
/// under the store's per-key guard, so concurrent creates can't claim the
/// same code and concurrent mutations can't lose updates.
pub trait RoomStore: Send + Sync + 'static {
    /// Reports whether the store can currently serve requests.
    ///
    /// Re-checked per request by callers — unavailability is a standing
    /// condition, not a fatal one.
    fn available(&self) -> impl Future<Output = bool> + Send;

    /// Stores or overwrites a room and re-arms its TTL.
    fn put(
        &self,
        code: &RoomCode,
        room: &Room,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Stores a room only if no live record holds its code.
    ///
    /// # Errors
    /// [`StoreError::Occupied`] when a live record already exists.
    fn insert(
        &self,
        code: &RoomCode,
        room: &Room,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Fetches a room. Expired records behave as absent.
    fn get(
        &self,
        code: &RoomCode,
    ) -> impl Future<Output = Result<Option<Room>, StoreError>> + Send;

    /// Returns `true` if a live record holds this code.
    fn exists(
        &self,
        code: &RoomCode,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Removes a room immediately. Removing an absent room is not an
    /// error.
    fn delete(
        &self,
        code: &RoomCode,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Atomically transforms a room under the store's per-key guard.
    ///
    /// The transform may reject with a domain error `E`, in which case
    /// nothing is written and the TTL is not re-armed. On success the
    /// transformed room is persisted and returned.
    ///
    /// The nested result separates the two failure planes: the outer
    /// [`StoreError`] is the store's (unavailable, absent, corrupt); the
    /// inner `E` is the transform's own rejection.
    fn update<F, E>(
        &self,
        code: &RoomCode,
        f: F,
    ) -> impl Future<Output = Result<Result<Room, E>, StoreError>> + Send
    where
        F: FnOnce(&mut Room) -> Result<(), E> + Send,
        E: Send;
}
