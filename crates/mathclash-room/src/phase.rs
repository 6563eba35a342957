//! The derived lifecycle state of a room.

use mathclash_protocol::Room;

/// Where a room stands in its lifecycle.
///
/// ```text
/// Forming → AwaitingReady → ReadyToStart → InProgress
///    (join)        (ready×all)      (start-game)
/// ```
///
/// - **Forming**: created, still a single player. A lone player can
///   never be "all ready" — multiplayer needs at least two.
/// - **AwaitingReady**: two or more players, not everyone ready.
/// - **ReadyToStart**: every player ready; the host may start.
/// - **InProgress**: a round has started. Further rounds re-enter via
///   `start_game` once players re-ready; the only exit is deletion
///   (empty room or TTL expiry).
///
/// The phase is *derived* from the room's contents rather than stored:
/// `players`, their `ready` flags, and `game_started` already determine
/// it, and a stored copy would be a second source of truth to keep
/// consistent across store round-trips.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomPhase {
    Forming,
    AwaitingReady,
    ReadyToStart,
    InProgress,
}

impl RoomPhase {
    /// Returns `true` once a round has started in this room.
    pub fn is_in_progress(&self) -> bool {
        matches!(self, Self::InProgress)
    }

    /// Returns `true` if the host may start a round right now.
    pub fn can_start(&self) -> bool {
        matches!(self, Self::ReadyToStart)
    }
}

impl std::fmt::Display for RoomPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Forming => write!(f, "Forming"),
            Self::AwaitingReady => write!(f, "AwaitingReady"),
            Self::ReadyToStart => write!(f, "ReadyToStart"),
            Self::InProgress => write!(f, "InProgress"),
        }
    }
}

/// True iff the room has at least two players and every one is ready.
///
/// The two-player floor is deliberate: readiness gates a *multiplayer*
/// round, and a single player marking themselves ready must not unlock
/// the start button.
pub fn all_players_ready(room: &Room) -> bool {
    room.players.len() > 1 && room.players.iter().all(|p| p.ready)
}

/// Derives the current [`RoomPhase`] of a room.
pub fn phase(room: &Room) -> RoomPhase {
    if room.game_started {
        RoomPhase::InProgress
    } else if all_players_ready(room) {
        RoomPhase::ReadyToStart
    } else if room.players.len() > 1 {
        RoomPhase::AwaitingReady
    } else {
        RoomPhase::Forming
    }
}
