//! Room manager: creates rooms, seats players, and starts rounds.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use mathclash_protocol::{ConnectionId, Player, Room, RoomCode};
use mathclash_store::{RoomStore, StoreError};
use rand::Rng;

use crate::{RoomError, all_players_ready};

/// Fixed room capacity.
pub const MAX_PLAYERS: usize = 6;

/// How many fresh codes creation tries before giving up. Bounds the
/// retry loop when the code space runs hot.
pub const MAX_CODE_ATTEMPTS: u32 = 50;

/// Outcome of removing a player.
#[derive(Debug)]
pub enum Removal {
    /// The room still has players; broadcast the new state.
    Updated(Room),
    /// That was the last player; the room is gone.
    RoomDeleted,
}

/// Outcome of a readiness change: the new room state plus the derived
/// everyone-is-ready signal the gateway turns into its own broadcast.
#[derive(Debug)]
pub struct ReadyUpdate {
    pub room: Room,
    pub all_ready: bool,
}

/// Enforces room lifecycle rules over an injected [`RoomStore`].
///
/// The manager owns no room state: every mutation is a transform applied
/// atomically by the store (`update`/`insert`), so concurrent commands
/// on the same room serialize per key and cannot clobber each other.
/// Construct one at process start and share it — it is cheap to clone.
pub struct RoomManager<S> {
    store: Arc<S>,
}

impl<S> Clone for RoomManager<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: RoomStore> RoomManager<S> {
    /// Creates a manager over the given store.
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Creates a room with the requester as host and sole player.
    ///
    /// Retries code generation up to [`MAX_CODE_ATTEMPTS`] times when
    /// the drawn code collides with a live room, then fails with
    /// [`RoomError::CodeSpaceExhausted`].
    pub async fn create_room(
        &self,
        host: ConnectionId,
        host_name: &str,
    ) -> Result<Room, RoomError> {
        self.ensure_available().await?;
        let name = valid_name(host_name)?;

        for _ in 0..MAX_CODE_ATTEMPTS {
            let code = {
                let mut rng = rand::rng();
                generate_code(&mut rng)
            };
            if self.store.exists(&code).await? {
                continue;
            }
            let room = Room::new(code.clone(), host, name, epoch_millis());
            match self.store.insert(&code, &room).await {
                Ok(()) => {
                    tracing::info!(%code, %host, "room created");
                    return Ok(room);
                }
                // Lost the race between exists() and insert(); a fresh
                // code costs less than fighting over this one.
                Err(StoreError::Occupied(_)) => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Err(RoomError::CodeSpaceExhausted(MAX_CODE_ATTEMPTS))
    }

    /// Seats a player in a room, or reactivates their existing seat.
    ///
    /// A join from a connection id already seated is a reconnection:
    /// the seat's `connected` flag flips back on and nothing is added.
    /// Returns the updated room and the joining player's seat.
    pub async fn add_player(
        &self,
        code: &RoomCode,
        id: ConnectionId,
        name: &str,
    ) -> Result<(Room, Player), RoomError> {
        self.ensure_available().await?;
        let name = valid_name(name)?;

        let room = self
            .store
            .update(code, |room| {
                if room.players.is_empty() {
                    // Emptied by a concurrent leave; the record is about
                    // to be deleted and must not be resurrected.
                    return Err(RoomError::RoomNotFound(code.clone()));
                }
                if let Some(player) = room.player_mut(id) {
                    player.connected = true;
                    return Ok(());
                }
                if room.players.len() >= MAX_PLAYERS {
                    return Err(RoomError::RoomFull(code.clone()));
                }
                room.players.push(Player::new(id, name));
                Ok(())
            })
            .await??;

        let player = room
            .player(id)
            .cloned()
            .expect("seat exists: the transform just added or touched it");
        tracing::info!(
            %code,
            %id,
            players = room.players.len(),
            "player joined"
        );
        Ok((room, player))
    }

    /// Removes a player's seat.
    ///
    /// Deletes the room when the last seat empties. When the host
    /// leaves, host role passes to the first remaining player in join
    /// order.
    pub async fn remove_player(
        &self,
        code: &RoomCode,
        id: ConnectionId,
    ) -> Result<Removal, RoomError> {
        self.ensure_available().await?;

        let room = self
            .store
            .update(code, |room| {
                let seat = room
                    .players
                    .iter()
                    .position(|p| p.id == id)
                    .ok_or_else(|| {
                        RoomError::PlayerNotFound(id, code.clone())
                    })?;
                room.players.remove(seat);
                if room.host == id {
                    if let Some(next) = room.players.first() {
                        room.host = next.id;
                        tracing::info!(
                            %code,
                            new_host = %next.id,
                            "host reassigned"
                        );
                    }
                }
                Ok::<(), RoomError>(())
            })
            .await??;

        if room.players.is_empty() {
            self.store.delete(code).await?;
            tracing::info!(%code, "room deleted (last player left)");
            return Ok(Removal::RoomDeleted);
        }

        tracing::info!(
            %code,
            %id,
            players = room.players.len(),
            "player left"
        );
        Ok(Removal::Updated(room))
    }

    /// Sets a player's readiness flag and reports whether the room is
    /// now all-ready.
    pub async fn set_ready(
        &self,
        code: &RoomCode,
        id: ConnectionId,
        ready: bool,
    ) -> Result<ReadyUpdate, RoomError> {
        self.ensure_available().await?;

        let room = self
            .store
            .update(code, |room| {
                let player = room.player_mut(id).ok_or_else(|| {
                    RoomError::PlayerNotFound(id, code.clone())
                })?;
                player.ready = ready;
                Ok::<(), RoomError>(())
            })
            .await??;

        let all_ready = all_players_ready(&room);
        tracing::debug!(%code, %id, ready, all_ready, "readiness updated");
        Ok(ReadyUpdate { room, all_ready })
    }

    /// Starts a round: host-only, and only once everyone is ready.
    ///
    /// Resets every seat's counters and readiness — the next round
    /// needs a fresh round of ready-ups — and records the chosen round
    /// configuration.
    pub async fn start_game(
        &self,
        code: &RoomCode,
        requester: ConnectionId,
        game_type: &str,
        time_limit: u32,
    ) -> Result<Room, RoomError> {
        self.ensure_available().await?;

        let room = self
            .store
            .update(code, |room| {
                if room.host != requester {
                    return Err(RoomError::NotHost);
                }
                if !all_players_ready(room) {
                    return Err(RoomError::PlayersNotReady);
                }
                room.game_started = true;
                room.game_type = Some(game_type.to_string());
                room.time_limit = Some(time_limit);
                for player in &mut room.players {
                    player.ready = false;
                    player.score = 0;
                    player.total_questions = 0;
                    player.correct_answers = 0;
                    player.accuracy = 0;
                }
                Ok(())
            })
            .await??;

        tracing::info!(
            %code,
            %requester,
            game_type,
            time_limit,
            players = room.players.len(),
            "game started"
        );
        Ok(room)
    }

    /// Fetches a room without touching it.
    pub async fn room(
        &self,
        code: &RoomCode,
    ) -> Result<Option<Room>, RoomError> {
        Ok(self.store.get(code).await?)
    }

    async fn ensure_available(&self) -> Result<(), RoomError> {
        if self.store.available().await {
            Ok(())
        } else {
            Err(RoomError::MultiplayerUnavailable)
        }
    }
}

/// Draws a random room code from [`RoomCode::ALPHABET`].
pub fn generate_code(rng: &mut impl Rng) -> RoomCode {
    let raw: String = (0..RoomCode::LEN)
        .map(|_| {
            let i = rng.random_range(0..RoomCode::ALPHABET.len());
            RoomCode::ALPHABET[i] as char
        })
        .collect();
    RoomCode::parse(&raw).expect("drawn from the code alphabet")
}

fn valid_name(name: &str) -> Result<&str, RoomError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(RoomError::EmptyName);
    }
    Ok(name)
}

fn epoch_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_millis() as u64)
}
