//! In-process room store.
//!
//! A `HashMap` of JSON strings behind one async lock. Records carry an
//! `expires_at` deadline checked lazily on every read, plus a periodic
//! sweep ([`MemoryStore::purge_expired`]) so abandoned rooms don't pin
//! memory until someone happens to look them up.
//!
//! Values are stored serialized — the same `room:<CODE>` → JSON layout an
//! external store would hold — so every read/write round-trips the wire
//! shape rather than sharing live references with callers.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use mathclash_protocol::{Room, RoomCode};
use tokio::sync::Mutex;

use crate::{ROOM_TTL, RoomStore, StoreError};

/// A stored room record with its expiry deadline.
struct Entry {
    json: String,
    expires_at: Instant,
}

impl Entry {
    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// In-process [`RoomStore`] implementation.
///
/// Availability is a runtime flag: a store constructed with
/// [`disabled()`](MemoryStore::disabled) (or switched off with
/// [`set_available`](MemoryStore::set_available)) refuses every
/// operation, standing in for an unreachable backend in tests and in
/// deployments that run single-player only.
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Entry>>,
    ttl: Duration,
    available: AtomicBool,
}

impl MemoryStore {
    /// Creates an available store with the standard [`ROOM_TTL`].
    pub fn new() -> Self {
        Self::with_ttl(ROOM_TTL)
    }

    /// Creates an available store with a custom TTL. Tests use near-zero
    /// TTLs to exercise expiry without sleeping.
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
            available: AtomicBool::new(true),
        }
    }

    /// Creates a store that refuses every operation, like a backend that
    /// never came up.
    pub fn disabled() -> Self {
        let store = Self::new();
        store.available.store(false, Ordering::Relaxed);
        store
    }

    /// Flips the availability flag at runtime.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::Relaxed);
        tracing::info!(available, "room store availability changed");
    }

    /// Removes every expired record. Returns how many were dropped.
    pub async fn purge_expired(&self) -> usize {
        let mut entries = self.entries.lock().await;
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired());
        let purged = before - entries.len();
        if purged > 0 {
            tracing::debug!(purged, "expired rooms purged");
        }
        purged
    }

    /// Number of records currently held, expired ones included.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    /// Returns `true` if no records are held.
    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

    /// Spawns a background task sweeping expired records at the given
    /// interval, for deployments where lookups alone wouldn't reap
    /// abandoned rooms.
    pub fn spawn_sweeper(
        self: Arc<Self>,
        every: Duration,
    ) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            loop {
                interval.tick().await;
                self.purge_expired().await;
            }
        })
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.available.load(Ordering::Relaxed) {
            Ok(())
        } else {
            Err(StoreError::Unavailable)
        }
    }

    fn key(code: &RoomCode) -> String {
        format!("room:{code}")
    }

    fn entry_for(&self, room: &Room) -> Result<Entry, StoreError> {
        Ok(Entry {
            json: serde_json::to_string(room)?,
            expires_at: Instant::now() + self.ttl,
        })
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RoomStore for MemoryStore {
    async fn available(&self) -> bool {
        self.available.load(Ordering::Relaxed)
    }

    async fn put(&self, code: &RoomCode, room: &Room) -> Result<(), StoreError> {
        self.check_available()?;
        let entry = self.entry_for(room)?;
        self.entries.lock().await.insert(Self::key(code), entry);
        Ok(())
    }

    async fn insert(
        &self,
        code: &RoomCode,
        room: &Room,
    ) -> Result<(), StoreError> {
        self.check_available()?;
        let entry = self.entry_for(room)?;
        let mut entries = self.entries.lock().await;
        // Check-then-write happens under the lock, so two concurrent
        // creates racing on the same code cannot both claim it.
        if entries
            .get(&Self::key(code))
            .is_some_and(|existing| !existing.is_expired())
        {
            return Err(StoreError::Occupied(code.clone()));
        }
        entries.insert(Self::key(code), entry);
        Ok(())
    }

    async fn get(&self, code: &RoomCode) -> Result<Option<Room>, StoreError> {
        self.check_available()?;
        let mut entries = self.entries.lock().await;
        let key = Self::key(code);
        if entries.get(&key).is_some_and(Entry::is_expired) {
            entries.remove(&key);
            tracing::debug!(%code, "room expired");
            return Ok(None);
        }
        match entries.get(&key) {
            Some(entry) => Ok(Some(serde_json::from_str(&entry.json)?)),
            None => Ok(None),
        }
    }

    async fn exists(&self, code: &RoomCode) -> Result<bool, StoreError> {
        self.check_available()?;
        let entries = self.entries.lock().await;
        Ok(entries
            .get(&Self::key(code))
            .is_some_and(|entry| !entry.is_expired()))
    }

    async fn delete(&self, code: &RoomCode) -> Result<(), StoreError> {
        self.check_available()?;
        self.entries.lock().await.remove(&Self::key(code));
        Ok(())
    }

    async fn update<F, E>(
        &self,
        code: &RoomCode,
        f: F,
    ) -> Result<Result<Room, E>, StoreError>
    where
        F: FnOnce(&mut Room) -> Result<(), E> + Send,
        E: Send,
    {
        self.check_available()?;
        let mut entries = self.entries.lock().await;
        let key = Self::key(code);

        if entries.get(&key).is_some_and(Entry::is_expired) {
            entries.remove(&key);
            return Err(StoreError::NotFound(code.clone()));
        }
        let entry = entries
            .get(&key)
            .ok_or_else(|| StoreError::NotFound(code.clone()))?;

        let mut room: Room = serde_json::from_str(&entry.json)?;
        if let Err(rejection) = f(&mut room) {
            // Rejected transform: nothing written, TTL untouched.
            return Ok(Err(rejection));
        }

        let json = serde_json::to_string(&room)?;
        entries.insert(
            key,
            Entry {
                json,
                expires_at: Instant::now() + self.ttl,
            },
        );
        Ok(Ok(room))
    }
}

// =========================================================================
// Tests
// =========================================================================
