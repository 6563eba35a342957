//! Per-connection handler: command dispatch and broadcast fan-out.
//!
//! Each accepted connection gets its own Tokio task running
//! [`handle_connection`]. The flow is:
//!
//!   1. Split the connection; spawn a writer task draining an outbound
//!      event channel, so broadcasts never wait on the read loop.
//!   2. Loop: receive frames → decode [`ClientCommand`] → dispatch to
//!      the room manager → fan results out to the room's broadcast
//!      group.
//!   3. On close or drop: run the same removal path as an explicit
//!      `leave-room`, so a vanished player never lingers in a room.
//!
//! Errors are answered to the originating connection only — never
//! broadcast — as `error { message }` events.

use std::collections::HashMap;
use std::sync::Arc;

use mathclash_protocol::{
    ClientCommand, Codec, ConnectionId, JsonCodec, RoomCode, ServerEvent,
};
use mathclash_room::{ReadyUpdate, Removal, RoomError, RoomManager};
use mathclash_store::RoomStore;
use mathclash_transport::WsConnection;
use tokio::sync::{Mutex, mpsc};

/// Channel sender delivering outbound events to one connection's writer
/// task.
pub(crate) type EventSender = mpsc::UnboundedSender<ServerEvent>;

/// Shared gateway state, one per process, cloned into each handler task
/// behind an `Arc`.
pub(crate) struct GatewayState<S> {
    pub(crate) rooms: RoomManager<S>,
    pub(crate) codec: JsonCodec,
    pub(crate) groups: Mutex<Groups>,
}

/// Broadcast-group bookkeeping: which connections subscribe to which
/// room's events, and the reverse map that lets an abrupt disconnect
/// find the room it has to leave.
///
/// Both maps live under one lock so they can never disagree.
#[derive(Default)]
pub(crate) struct Groups {
    rooms: HashMap<RoomCode, HashMap<ConnectionId, EventSender>>,
    by_conn: HashMap<ConnectionId, RoomCode>,
}

impl Groups {
    /// Subscribes a connection to a room's broadcast group.
    fn subscribe(
        &mut self,
        code: RoomCode,
        id: ConnectionId,
        sender: EventSender,
    ) {
        self.rooms
            .entry(code.clone())
            .or_default()
            .insert(id, sender);
        self.by_conn.insert(id, code);
    }

    /// Removes a connection from whatever group it is in. Empty groups
    /// are pruned.
    fn unsubscribe(&mut self, id: ConnectionId) {
        let Some(code) = self.by_conn.remove(&id) else {
            return;
        };
        if let Some(members) = self.rooms.get_mut(&code) {
            members.remove(&id);
            if members.is_empty() {
                self.rooms.remove(&code);
            }
        }
    }

    /// The room this connection is subscribed to, if any.
    fn membership(&self, id: ConnectionId) -> Option<&RoomCode> {
        self.by_conn.get(&id)
    }

    /// Sends an event to every member of a room's group, optionally
    /// skipping one connection. Dead receivers are silently ignored —
    /// their disconnect cleanup is already on its way.
    fn broadcast(
        &self,
        code: &RoomCode,
        event: ServerEvent,
        except: Option<ConnectionId>,
    ) {
        let Some(members) = self.rooms.get(code) else {
            return;
        };
        for (id, sender) in members {
            if Some(*id) == except {
                continue;
            }
            let _ = sender.send(event.clone());
        }
    }
}

/// Handles one connection from accept to close.
pub(crate) async fn handle_connection<S: RoomStore>(
    conn: WsConnection,
    state: Arc<GatewayState<S>>,
) {
    let conn_id = conn.id();
    let (mut sender, mut receiver) = conn.split();
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<ServerEvent>();

    // Writer task: the only place this connection's frames are written.
    let codec = state.codec;
    let writer = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            let bytes = match codec.encode(&event) {
                Ok(bytes) => bytes,
                Err(e) => {
                    tracing::warn!(error = %e, "failed to encode event");
                    continue;
                }
            };
            if sender.send(&bytes).await.is_err() {
                break;
            }
        }
        let _ = sender.close().await;
    });

    tracing::debug!(%conn_id, "client connected");

    loop {
        let data = match receiver.recv().await {
            Ok(Some(data)) => data,
            Ok(None) => {
                tracing::debug!(%conn_id, "connection closed");
                break;
            }
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "receive error");
                break;
            }
        };

        let cmd: ClientCommand = match state.codec.decode(&data) {
            Ok(cmd) => cmd,
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "unparseable command");
                let _ = event_tx.send(ServerEvent::Error {
                    message: "unrecognized command".into(),
                });
                continue;
            }
        };

        dispatch(&state, conn_id, &event_tx, cmd).await;
    }

    // Clean close and abrupt drop take the same path as an explicit
    // leave-room: the player's seat is freed immediately.
    disconnect_cleanup(&state, conn_id).await;

    drop(event_tx);
    let _ = writer.await;
}

/// Routes one command to its handler and answers failures with an
/// `error` event to the requester.
async fn dispatch<S: RoomStore>(
    state: &Arc<GatewayState<S>>,
    conn_id: ConnectionId,
    reply: &EventSender,
    cmd: ClientCommand,
) {
    let result = match cmd {
        ClientCommand::CreateRoom { player_name } => {
            create_room(state, conn_id, reply, &player_name).await
        }
        ClientCommand::JoinRoom {
            room_code,
            player_name,
        } => join_room(state, conn_id, reply, &room_code, &player_name).await,
        ClientCommand::PlayerReady { room_code, ready } => {
            player_ready(state, conn_id, &room_code, ready).await
        }
        ClientCommand::StartGame {
            room_code,
            game_type,
            time_limit,
        } => start_game(state, conn_id, &room_code, &game_type, time_limit)
            .await,
        ClientCommand::LeaveRoom { room_code } => {
            leave_room(state, conn_id, &room_code).await
        }
    };

    if let Err(err) = result {
        tracing::debug!(
            %conn_id,
            kind = ?err.kind(),
            error = %err,
            "command failed"
        );
        let _ = reply.send(ServerEvent::Error {
            message: err.to_string(),
        });
    }
}

async fn create_room<S: RoomStore>(
    state: &GatewayState<S>,
    conn_id: ConnectionId,
    reply: &EventSender,
    player_name: &str,
) -> Result<(), RoomError> {
    ensure_can_join(state, conn_id, None).await?;

    let room = state.rooms.create_room(conn_id, player_name).await?;

    let mut groups = state.groups.lock().await;
    groups.subscribe(room.code.clone(), conn_id, reply.clone());
    drop(groups);

    let _ = reply.send(ServerEvent::RoomCreated {
        room_code: room.code.clone(),
        room,
    });
    Ok(())
}

async fn join_room<S: RoomStore>(
    state: &GatewayState<S>,
    conn_id: ConnectionId,
    reply: &EventSender,
    room_code: &str,
    player_name: &str,
) -> Result<(), RoomError> {
    let code = RoomCode::parse(room_code)?;
    ensure_can_join(state, conn_id, Some(&code)).await?;

    let (room, player) =
        state.rooms.add_player(&code, conn_id, player_name).await?;

    let mut groups = state.groups.lock().await;
    groups.subscribe(code.clone(), conn_id, reply.clone());
    // The rest of the room learns about the newcomer; the newcomer gets
    // the full state directly.
    groups.broadcast(
        &code,
        ServerEvent::PlayerJoined {
            player,
            room: room.clone(),
        },
        Some(conn_id),
    );
    drop(groups);

    let _ = reply.send(ServerEvent::RoomJoined { room });
    Ok(())
}

async fn player_ready<S: RoomStore>(
    state: &GatewayState<S>,
    conn_id: ConnectionId,
    room_code: &str,
    ready: bool,
) -> Result<(), RoomError> {
    let code = RoomCode::parse(room_code)?;
    let ReadyUpdate { room, all_ready } =
        state.rooms.set_ready(&code, conn_id, ready).await?;

    let groups = state.groups.lock().await;
    groups.broadcast(
        &code,
        ServerEvent::PlayerReadyUpdate {
            player_id: conn_id,
            ready,
            room,
        },
        None,
    );
    if all_ready {
        groups.broadcast(&code, ServerEvent::AllPlayersReady, None);
    }
    Ok(())
}

async fn start_game<S: RoomStore>(
    state: &GatewayState<S>,
    conn_id: ConnectionId,
    room_code: &str,
    game_type: &str,
    time_limit: u32,
) -> Result<(), RoomError> {
    let code = RoomCode::parse(room_code)?;
    let room = state
        .rooms
        .start_game(&code, conn_id, game_type, time_limit)
        .await?;

    let groups = state.groups.lock().await;
    groups.broadcast(
        &code,
        ServerEvent::GameStarted {
            game_type: game_type.to_string(),
            time_limit,
            room,
        },
        None,
    );
    Ok(())
}

async fn leave_room<S: RoomStore>(
    state: &GatewayState<S>,
    conn_id: ConnectionId,
    room_code: &str,
) -> Result<(), RoomError> {
    let code = RoomCode::parse(room_code)?;
    remove_and_broadcast(state, conn_id, &code).await
}

/// Frees a player's seat and tells the survivors. Shared by explicit
/// `leave-room` and disconnect cleanup.
async fn remove_and_broadcast<S: RoomStore>(
    state: &GatewayState<S>,
    conn_id: ConnectionId,
    code: &RoomCode,
) -> Result<(), RoomError> {
    let removal = state.rooms.remove_player(code, conn_id).await?;

    let mut groups = state.groups.lock().await;
    groups.unsubscribe(conn_id);
    match removal {
        Removal::Updated(room) => groups.broadcast(
            code,
            ServerEvent::PlayerLeft {
                player_id: conn_id,
                room,
            },
            None,
        ),
        Removal::RoomDeleted => {
            groups.broadcast(code, ServerEvent::RoomDeleted, None);
        }
    }
    Ok(())
}

/// Refuses create/join for a connection already seated elsewhere. A
/// join targeting the room the connection is already in passes — that
/// is the reconnection path.
async fn ensure_can_join<S: RoomStore>(
    state: &GatewayState<S>,
    conn_id: ConnectionId,
    target: Option<&RoomCode>,
) -> Result<(), RoomError> {
    let groups = state.groups.lock().await;
    match groups.membership(conn_id) {
        Some(code) if Some(code) != target => {
            Err(RoomError::AlreadyInRoom(conn_id, code.clone()))
        }
        _ => Ok(()),
    }
}

/// Runs the leave path for a dropped connection, if it was in a room.
async fn disconnect_cleanup<S: RoomStore>(
    state: &GatewayState<S>,
    conn_id: ConnectionId,
) {
    let code = {
        let groups = state.groups.lock().await;
        groups.membership(conn_id).cloned()
    };
    let Some(code) = code else {
        return;
    };

    tracing::info!(%conn_id, %code, "connection dropped, leaving room");
    if let Err(err) = remove_and_broadcast(state, conn_id, &code).await {
        // The store may be down; still drop the local subscription so
        // the group doesn't hold a dead sender.
        tracing::warn!(
            %conn_id,
            %code,
            error = %err,
            "disconnect cleanup failed"
        );
        state.groups.lock().await.unsubscribe(conn_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code(s: &str) -> RoomCode {
        RoomCode::parse(s).unwrap()
    }

    fn sender() -> (EventSender, mpsc::UnboundedReceiver<ServerEvent>) {
        mpsc::unbounded_channel()
    }

    #[test]
    fn test_subscribe_then_broadcast_reaches_members() {
        let mut groups = Groups::default();
        let (tx1, mut rx1) = sender();
        let (tx2, mut rx2) = sender();
        groups.subscribe(code("AB12CD"), ConnectionId(1), tx1);
        groups.subscribe(code("AB12CD"), ConnectionId(2), tx2);

        groups.broadcast(&code("AB12CD"), ServerEvent::AllPlayersReady, None);

        assert!(matches!(
            rx1.try_recv(),
            Ok(ServerEvent::AllPlayersReady)
        ));
        assert!(matches!(
            rx2.try_recv(),
            Ok(ServerEvent::AllPlayersReady)
        ));
    }

    #[test]
    fn test_broadcast_except_skips_the_requester() {
        let mut groups = Groups::default();
        let (tx1, mut rx1) = sender();
        let (tx2, mut rx2) = sender();
        groups.subscribe(code("AB12CD"), ConnectionId(1), tx1);
        groups.subscribe(code("AB12CD"), ConnectionId(2), tx2);

        groups.broadcast(
            &code("AB12CD"),
            ServerEvent::AllPlayersReady,
            Some(ConnectionId(1)),
        );

        assert!(rx1.try_recv().is_err());
        assert!(rx2.try_recv().is_ok());
    }

    #[test]
    fn test_broadcast_is_scoped_to_the_room() {
        let mut groups = Groups::default();
        let (tx1, mut rx1) = sender();
        let (tx2, mut rx2) = sender();
        groups.subscribe(code("AB12CD"), ConnectionId(1), tx1);
        groups.subscribe(code("EF34GH"), ConnectionId(2), tx2);

        groups.broadcast(&code("AB12CD"), ServerEvent::RoomDeleted, None);

        assert!(rx1.try_recv().is_ok());
        assert!(rx2.try_recv().is_err(), "other rooms must not hear it");
    }

    #[test]
    fn test_unsubscribe_clears_membership_and_prunes_group() {
        let mut groups = Groups::default();
        let (tx, mut rx) = sender();
        groups.subscribe(code("AB12CD"), ConnectionId(1), tx);

        groups.unsubscribe(ConnectionId(1));

        assert!(groups.membership(ConnectionId(1)).is_none());
        groups.broadcast(&code("AB12CD"), ServerEvent::RoomDeleted, None);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_unsubscribe_unknown_connection_is_noop() {
        let mut groups = Groups::default();
        groups.unsubscribe(ConnectionId(42));
    }
}
