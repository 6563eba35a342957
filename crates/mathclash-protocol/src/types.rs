//! Core protocol types: identities, room state, and the event protocol.
//!
//! Everything here is a wire type — these structures get serialized to
//! JSON, sent over the WebSocket, and (for [`Room`]) persisted in the
//! room store. The JSON shapes are load-bearing: the browser client
//! multiplexes on the `event` name and reads camelCase data fields, so
//! the serde attributes below are part of the protocol contract, not
//! cosmetics.

use serde::{Deserialize, Serialize};

use std::fmt;

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A unique identifier for one client connection.
///
/// Newtype over `u64`, assigned by the transport accept loop. This is the
/// player's identity for the lifetime of the connection — there are no
/// durable accounts. Serialized as a plain number via
/// `#[serde(transparent)]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(pub u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// A six-character room code from the alphabet `[A-Z0-9]`.
///
/// Codes are what players type (or paste) to join a friend's room, so
/// [`RoomCode::parse`] normalizes before validating: surrounding
/// whitespace is trimmed and letters are uppercased. A stored or
/// broadcast `RoomCode` is always in canonical form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomCode(String);

impl RoomCode {
    /// Length of every room code.
    pub const LEN: usize = 6;

    /// The characters a room code may contain.
    pub const ALPHABET: &'static [u8] =
        b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

    /// Parses user input into a canonical room code.
    ///
    /// # Errors
    /// Returns [`ProtocolError::InvalidRoomCode`] if the normalized
    /// input is not exactly [`LEN`](Self::LEN) characters from
    /// [`ALPHABET`](Self::ALPHABET).
    pub fn parse(input: &str) -> Result<Self, ProtocolError> {
        let code = input.trim().to_ascii_uppercase();
        let valid = code.len() == Self::LEN
            && code
                .bytes()
                .all(|b| matches!(b, b'A'..=b'Z' | b'0'..=b'9'));
        if !valid {
            return Err(ProtocolError::InvalidRoomCode(input.to_string()));
        }
        Ok(Self(code))
    }

    /// Returns the code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Room state
// ---------------------------------------------------------------------------

/// One player's seat in a room.
///
/// Embedded in [`Room`]; never stored or sent on its own except inside
/// the `player-joined` broadcast. The counters are session-scoped — they
/// are zeroed every time a new round starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    /// The connection this seat belongs to.
    pub id: ConnectionId,
    /// Display name, trimmed and non-empty.
    pub name: String,
    /// Readiness flag gating the next round start.
    pub ready: bool,
    /// Points scored this round.
    pub score: u32,
    /// Questions seen this round.
    pub total_questions: u32,
    /// Questions answered correctly this round.
    pub correct_answers: u32,
    /// Rounded percentage, `correct_answers / total_questions`.
    pub accuracy: u32,
    /// Liveness flag; flipped back to `true` when the same connection
    /// rejoins.
    pub connected: bool,
}

impl Player {
    /// Creates a fresh, not-ready player with zeroed counters.
    pub fn new(id: ConnectionId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            ready: false,
            score: 0,
            total_questions: 0,
            correct_answers: 0,
            accuracy: 0,
            connected: true,
        }
    }
}

/// A multiplayer quiz room.
///
/// The single record the room store persists (key `room:<CODE>`, value =
/// this struct as JSON) and the payload every broadcast carries so
/// clients can replace their snapshot wholesale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    /// Shareable identifier, unique among live rooms.
    pub code: RoomCode,
    /// The connection currently designated host. Always a member of
    /// `players` unless the room is about to be deleted.
    pub host: ConnectionId,
    /// Players in join order. Host role is tracked by `host`, not by
    /// position — reassignment doesn't reorder anyone.
    pub players: Vec<Player>,
    /// Whether a round is in progress.
    pub game_started: bool,
    /// Round configuration chosen by the host at start. Opaque to the
    /// room layer; the quiz engine interprets it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub game_type: Option<String>,
    /// Round length in seconds, chosen by the host at start.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_limit: Option<u32>,
    /// Creation time, epoch milliseconds.
    pub created_at: u64,
}

impl Room {
    /// Creates a room with the host as its sole player and no round
    /// running.
    pub fn new(
        code: RoomCode,
        host: ConnectionId,
        host_name: impl Into<String>,
        created_at: u64,
    ) -> Self {
        Self {
            code,
            host,
            players: vec![Player::new(host, host_name)],
            game_started: false,
            game_type: None,
            time_limit: None,
            created_at,
        }
    }

    /// Looks up a player by connection id.
    pub fn player(&self, id: ConnectionId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    /// Mutable lookup by connection id.
    pub fn player_mut(&mut self, id: ConnectionId) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.id == id)
    }

    /// Returns `true` if the connection holds a seat in this room.
    pub fn contains(&self, id: ConnectionId) -> bool {
        self.player(id).is_some()
    }
}

// ---------------------------------------------------------------------------
// Event protocol
// ---------------------------------------------------------------------------

/// Commands a client sends to the gateway.
///
/// `#[serde(tag = "event", content = "data")]` produces the adjacently
/// tagged shape the browser client emits:
///
/// ```json
/// { "event": "join-room", "data": { "roomCode": "AB12CD", "playerName": "Bob" } }
/// ```
///
/// Room codes arrive as raw strings — they are whatever the player typed
/// — and are normalized by [`RoomCode::parse`] at the gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ClientCommand {
    /// Create a room and become its host.
    #[serde(rename_all = "camelCase")]
    CreateRoom { player_name: String },

    /// Join an existing room by code.
    #[serde(rename_all = "camelCase")]
    JoinRoom {
        room_code: String,
        player_name: String,
    },

    /// Set or clear this player's readiness flag.
    #[serde(rename_all = "camelCase")]
    PlayerReady { room_code: String, ready: bool },

    /// Start a round (host only, all players ready).
    #[serde(rename_all = "camelCase")]
    StartGame {
        room_code: String,
        game_type: String,
        time_limit: u32,
    },

    /// Leave the current room.
    #[serde(rename_all = "camelCase")]
    LeaveRoom { room_code: String },
}

/// Events the gateway sends to clients.
///
/// Same adjacent tagging as [`ClientCommand`]. Unit variants
/// (`all-players-ready`, `room-deleted`) serialize with no `data` key —
/// those events carry nothing but their name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ServerEvent {
    /// To the requester only: your room exists, share the code.
    #[serde(rename_all = "camelCase")]
    RoomCreated { room_code: RoomCode, room: Room },

    /// To the requester only: you are in, here is the current state.
    #[serde(rename_all = "camelCase")]
    RoomJoined { room: Room },

    /// To the rest of the room: someone joined.
    #[serde(rename_all = "camelCase")]
    PlayerJoined { player: Player, room: Room },

    /// To the room: someone left (or dropped).
    #[serde(rename_all = "camelCase")]
    PlayerLeft {
        player_id: ConnectionId,
        room: Room,
    },

    /// To the room: a readiness flag changed.
    #[serde(rename_all = "camelCase")]
    PlayerReadyUpdate {
        player_id: ConnectionId,
        ready: bool,
        room: Room,
    },

    /// To the room: every seat is ready, the host can start.
    AllPlayersReady,

    /// To the room: the round is on.
    #[serde(rename_all = "camelCase")]
    GameStarted {
        game_type: String,
        time_limit: u32,
        room: Room,
    },

    /// To the room: the last player left, the room is gone.
    RoomDeleted,

    /// To the originating connection only, never broadcast.
    #[serde(rename_all = "camelCase")]
    Error { message: String },
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    //! The wire shapes here are a contract with the browser client.
    //! These tests pin the exact JSON each serde attribute produces,
    //! because a drifted field name means the client silently ignores
    //! the event.

    use super::*;

    fn room_fixture() -> Room {
        let code = RoomCode::parse("AB12CD").unwrap();
        Room::new(code, ConnectionId(7), "Alice", 1_700_000_000_000)
    }

    // =====================================================================
    // Identity types
    // =====================================================================

    #[test]
    fn test_connection_id_serializes_as_plain_number() {
        let json = serde_json::to_string(&ConnectionId(42)).unwrap();
        assert_eq!(json, "42");
    }

    #[test]
    fn test_connection_id_display() {
        assert_eq!(ConnectionId(7).to_string(), "conn-7");
    }

    #[test]
    fn test_room_code_parse_normalizes_case_and_whitespace() {
        let code = RoomCode::parse("  ab12cd ").unwrap();
        assert_eq!(code.as_str(), "AB12CD");
    }

    #[test]
    fn test_room_code_parse_rejects_wrong_length() {
        assert!(RoomCode::parse("AB12").is_err());
        assert!(RoomCode::parse("AB12CDE").is_err());
        assert!(RoomCode::parse("").is_err());
    }

    #[test]
    fn test_room_code_parse_rejects_bad_characters() {
        assert!(RoomCode::parse("AB-2CD").is_err());
        assert!(RoomCode::parse("AB12C!").is_err());
        // Multi-byte input must not slip through the length check.
        assert!(RoomCode::parse("ÅB12CD").is_err());
    }

    #[test]
    fn test_room_code_serializes_as_plain_string() {
        let code = RoomCode::parse("XY99ZZ").unwrap();
        assert_eq!(serde_json::to_string(&code).unwrap(), "\"XY99ZZ\"");
    }

    // =====================================================================
    // Room / Player JSON shape
    // =====================================================================

    #[test]
    fn test_player_json_uses_camel_case_fields() {
        let player = Player::new(ConnectionId(3), "Bob");
        let json = serde_json::to_value(&player).unwrap();

        assert_eq!(json["id"], 3);
        assert_eq!(json["name"], "Bob");
        assert_eq!(json["ready"], false);
        assert_eq!(json["totalQuestions"], 0);
        assert_eq!(json["correctAnswers"], 0);
        assert_eq!(json["accuracy"], 0);
        assert_eq!(json["connected"], true);
    }

    #[test]
    fn test_room_json_shape() {
        let room = room_fixture();
        let json = serde_json::to_value(&room).unwrap();

        assert_eq!(json["code"], "AB12CD");
        assert_eq!(json["host"], 7);
        assert_eq!(json["gameStarted"], false);
        assert_eq!(json["createdAt"], 1_700_000_000_000u64);
        assert_eq!(json["players"][0]["name"], "Alice");
        // Unset round config is omitted, not null.
        assert!(json.get("gameType").is_none());
        assert!(json.get("timeLimit").is_none());
    }

    #[test]
    fn test_room_round_trip_with_round_config() {
        let mut room = room_fixture();
        room.game_started = true;
        room.game_type = Some("addition".into());
        room.time_limit = Some(60);

        let bytes = serde_json::to_vec(&room).unwrap();
        let decoded: Room = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(room, decoded);
    }

    #[test]
    fn test_room_new_seats_host_first() {
        let room = room_fixture();
        assert_eq!(room.players.len(), 1);
        assert_eq!(room.players[0].id, room.host);
        assert!(room.contains(ConnectionId(7)));
        assert!(!room.contains(ConnectionId(8)));
    }

    // =====================================================================
    // ClientCommand — one shape test per command
    // =====================================================================

    #[test]
    fn test_create_room_command_json() {
        let cmd = ClientCommand::CreateRoom {
            player_name: "Alice".into(),
        };
        let json = serde_json::to_value(&cmd).unwrap();

        assert_eq!(json["event"], "create-room");
        assert_eq!(json["data"]["playerName"], "Alice");
    }

    #[test]
    fn test_join_room_command_json() {
        let cmd = ClientCommand::JoinRoom {
            room_code: "AB12CD".into(),
            player_name: "Bob".into(),
        };
        let json = serde_json::to_value(&cmd).unwrap();

        assert_eq!(json["event"], "join-room");
        assert_eq!(json["data"]["roomCode"], "AB12CD");
        assert_eq!(json["data"]["playerName"], "Bob");
    }

    #[test]
    fn test_player_ready_command_json() {
        let cmd = ClientCommand::PlayerReady {
            room_code: "AB12CD".into(),
            ready: true,
        };
        let json = serde_json::to_value(&cmd).unwrap();

        assert_eq!(json["event"], "player-ready");
        assert_eq!(json["data"]["ready"], true);
    }

    #[test]
    fn test_start_game_command_json() {
        let cmd = ClientCommand::StartGame {
            room_code: "AB12CD".into(),
            game_type: "multiplication".into(),
            time_limit: 90,
        };
        let json = serde_json::to_value(&cmd).unwrap();

        assert_eq!(json["event"], "start-game");
        assert_eq!(json["data"]["gameType"], "multiplication");
        assert_eq!(json["data"]["timeLimit"], 90);
    }

    #[test]
    fn test_leave_room_command_round_trip() {
        let cmd = ClientCommand::LeaveRoom {
            room_code: "AB12CD".into(),
        };
        let bytes = serde_json::to_vec(&cmd).unwrap();
        let decoded: ClientCommand = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(cmd, decoded);
    }

    // =====================================================================
    // ServerEvent
    // =====================================================================

    #[test]
    fn test_room_created_event_json() {
        let room = room_fixture();
        let event = ServerEvent::RoomCreated {
            room_code: room.code.clone(),
            room,
        };
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["event"], "room-created");
        assert_eq!(json["data"]["roomCode"], "AB12CD");
        assert_eq!(json["data"]["room"]["host"], 7);
    }

    #[test]
    fn test_player_ready_update_event_json() {
        let event = ServerEvent::PlayerReadyUpdate {
            player_id: ConnectionId(3),
            ready: true,
            room: room_fixture(),
        };
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["event"], "player-ready-update");
        assert_eq!(json["data"]["playerId"], 3);
        assert_eq!(json["data"]["ready"], true);
    }

    #[test]
    fn test_unit_events_have_no_data_key() {
        let json = serde_json::to_value(&ServerEvent::AllPlayersReady).unwrap();
        assert_eq!(json["event"], "all-players-ready");
        assert!(json.get("data").is_none());

        let json = serde_json::to_value(&ServerEvent::RoomDeleted).unwrap();
        assert_eq!(json["event"], "room-deleted");
        assert!(json.get("data").is_none());
    }

    #[test]
    fn test_game_started_event_round_trip() {
        let event = ServerEvent::GameStarted {
            game_type: "mix".into(),
            time_limit: 120,
            room: room_fixture(),
        };
        let bytes = serde_json::to_vec(&event).unwrap();
        let decoded: ServerEvent = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(event, decoded);
    }

    #[test]
    fn test_error_event_json() {
        let event = ServerEvent::Error {
            message: "room AB12CD not found".into(),
        };
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["event"], "error");
        assert_eq!(json["data"]["message"], "room AB12CD not found");
    }

    // =====================================================================
    // Malformed input
    // =====================================================================

    #[test]
    fn test_decode_garbage_returns_error() {
        let garbage = b"not json at all";
        let result: Result<ClientCommand, _> =
            serde_json::from_slice(garbage);
        assert!(result.is_err());
    }

    #[test]
    fn test_decode_unknown_event_returns_error() {
        let unknown = r#"{"event": "fly-to-moon", "data": {"speed": 9000}}"#;
        let result: Result<ClientCommand, _> =
            serde_json::from_str(unknown);
        assert!(result.is_err());
    }

    #[test]
    fn test_decode_missing_data_field_returns_error() {
        // join-room without its payload must not half-parse.
        let missing = r#"{"event": "join-room"}"#;
        let result: Result<ClientCommand, _> =
            serde_json::from_str(missing);
        assert!(result.is_err());
    }
}
