//! The session controller: one connection, promise-style room
//! operations, and subscription channels for observers.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use mathclash_protocol::{
    ClientCommand, Codec, JsonCodec, Room, RoomCode, ServerEvent,
};
use tokio::sync::{Mutex, broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;

use crate::ClientError;

/// Bounded wait for request-style operations.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Capacity of the subscription channels. Observers that fall this far
/// behind start losing the oldest events (`broadcast` lag semantics).
const SUBSCRIBER_BUFFER: usize = 64;

/// Connection-status transitions observable through
/// [`SessionController::subscribe_status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Connected,
    Disconnected,
}

type PendingReply = oneshot::Sender<Result<Room, ClientError>>;

/// Replies waiting for their matching server event. At most one of each
/// kind at a time — the wire has no request ids to correlate more.
#[derive(Default)]
struct Pending {
    create: Option<PendingReply>,
    join: Option<PendingReply>,
}

/// State shared between the controller handle and its reader task.
struct Shared {
    connected: AtomicBool,
    pending: Mutex<Pending>,
    room_tx: watch::Sender<Option<Room>>,
    status_tx: broadcast::Sender<ConnectionStatus>,
    event_tx: broadcast::Sender<ServerEvent>,
}

/// A single client session against the Mathclash gateway.
///
/// Cheap to use from multiple tasks through `&self`; drops (or an
/// explicit [`disconnect`](Self::disconnect)) end the session.
pub struct SessionController {
    cmd_tx: mpsc::UnboundedSender<ClientCommand>,
    shared: Arc<Shared>,
    room_rx: watch::Receiver<Option<Room>>,
    request_timeout: Duration,
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
}

impl SessionController {
    /// Connects to the gateway at `url` (e.g. `ws://127.0.0.1:8090`)
    /// and spawns the session's reader and writer tasks.
    pub async fn connect(url: &str) -> Result<Self, ClientError> {
        let (ws, _) = tokio_tungstenite::connect_async(url).await?;
        let (mut sink, mut stream) = ws.split();

        let (room_tx, room_rx) = watch::channel(None);
        let (status_tx, _) = broadcast::channel(SUBSCRIBER_BUFFER);
        let (event_tx, _) = broadcast::channel(SUBSCRIBER_BUFFER);
        let shared = Arc::new(Shared {
            connected: AtomicBool::new(true),
            pending: Mutex::new(Pending::default()),
            room_tx,
            status_tx,
            event_tx,
        });

        let codec = JsonCodec;
        let (cmd_tx, mut cmd_rx) =
            mpsc::unbounded_channel::<ClientCommand>();

        let writer = tokio::spawn(async move {
            while let Some(cmd) = cmd_rx.recv().await {
                let bytes = match codec.encode(&cmd) {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        tracing::warn!(error = %e, "failed to encode command");
                        continue;
                    }
                };
                if sink.send(Message::Binary(bytes.into())).await.is_err() {
                    break;
                }
            }
            let _ = sink.close().await;
        });

        let reader_shared = Arc::clone(&shared);
        let reader = tokio::spawn(async move {
            while let Some(frame) = stream.next().await {
                let bytes = match frame {
                    Ok(Message::Binary(data)) => data.to_vec(),
                    Ok(Message::Text(text)) => text.as_bytes().to_vec(),
                    Ok(Message::Close(_)) => break,
                    Ok(_) => continue,
                    Err(e) => {
                        tracing::debug!(error = %e, "read error");
                        break;
                    }
                };
                match codec.decode::<ServerEvent>(&bytes) {
                    Ok(event) => {
                        handle_event(&reader_shared, event).await;
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "unparseable event");
                    }
                }
            }

            reader_shared.connected.store(false, Ordering::Relaxed);
            let _ = reader_shared
                .status_tx
                .send(ConnectionStatus::Disconnected);
            // Anyone still waiting for a reply is not getting one.
            let mut pending = reader_shared.pending.lock().await;
            let pending = &mut *pending;
            for slot in [&mut pending.create, &mut pending.join] {
                if let Some(tx) = slot.take() {
                    let _ = tx.send(Err(ClientError::ConnectionClosed));
                }
            }
        });

        let _ = shared.status_tx.send(ConnectionStatus::Connected);
        tracing::debug!(url, "session connected");

        Ok(Self {
            cmd_tx,
            shared,
            room_rx,
            request_timeout: REQUEST_TIMEOUT,
            reader,
            writer,
        })
    }

    /// Overrides the bounded wait for request-style operations.
    pub fn set_request_timeout(&mut self, timeout: Duration) {
        self.request_timeout = timeout;
    }

    /// Whether the connection is currently up.
    pub fn is_connected(&self) -> bool {
        self.shared.connected.load(Ordering::Relaxed)
    }

    /// The last room state any broadcast carried, if this session is in
    /// a room.
    pub fn current_room(&self) -> Option<Room> {
        self.room_rx.borrow().clone()
    }

    /// A [`watch`] receiver tracking the room snapshot. Handy for UI
    /// code that wants to re-render on every change.
    pub fn room_updates(&self) -> watch::Receiver<Option<Room>> {
        self.room_rx.clone()
    }

    /// Subscribes to connection-status transitions. Each subscriber
    /// observes transitions independently.
    pub fn subscribe_status(&self) -> broadcast::Receiver<ConnectionStatus> {
        self.shared.status_tx.subscribe()
    }

    /// Subscribes to the raw stream of server events.
    pub fn subscribe_events(&self) -> broadcast::Receiver<ServerEvent> {
        self.shared.event_tx.subscribe()
    }

    /// Creates a room, resolving with its initial state.
    ///
    /// Rejects on the server's `error` event, or with
    /// [`ClientError::Timeout`] after the bounded wait. The timeout is
    /// advisory — it cancels no server-side work.
    pub async fn create_room(
        &self,
        player_name: &str,
    ) -> Result<Room, ClientError> {
        let rx = self
            .register(|p| &mut p.create, "create-room")
            .await?;
        self.send(ClientCommand::CreateRoom {
            player_name: player_name.to_string(),
        })?;
        self.wait(rx, |p| &mut p.create, "create-room").await
    }

    /// Joins an existing room by code, resolving with its state.
    pub async fn join_room(
        &self,
        room_code: &str,
        player_name: &str,
    ) -> Result<Room, ClientError> {
        let rx = self.register(|p| &mut p.join, "join-room").await?;
        self.send(ClientCommand::JoinRoom {
            room_code: room_code.to_string(),
            player_name: player_name.to_string(),
        })?;
        self.wait(rx, |p| &mut p.join, "join-room").await
    }

    /// Sets this player's readiness flag. Fire-and-forget; the result
    /// arrives as a `player-ready-update` broadcast.
    pub fn set_ready(
        &self,
        code: &RoomCode,
        ready: bool,
    ) -> Result<(), ClientError> {
        self.send(ClientCommand::PlayerReady {
            room_code: code.as_str().to_string(),
            ready,
        })
    }

    /// Starts a round (host only). Fire-and-forget; success arrives as
    /// `game-started`, failure as an `error` event.
    pub fn start_game(
        &self,
        code: &RoomCode,
        game_type: &str,
        time_limit: u32,
    ) -> Result<(), ClientError> {
        self.send(ClientCommand::StartGame {
            room_code: code.as_str().to_string(),
            game_type: game_type.to_string(),
            time_limit,
        })
    }

    /// Leaves the current room and clears the local snapshot.
    pub fn leave_room(&self, code: &RoomCode) -> Result<(), ClientError> {
        self.send(ClientCommand::LeaveRoom {
            room_code: code.as_str().to_string(),
        })?;
        self.shared.room_tx.send_replace(None);
        Ok(())
    }

    /// Closes the connection and waits for the session tasks to finish.
    pub async fn disconnect(self) {
        // Dropping the command channel makes the writer close the sink;
        // the server's close reply (or the dropped TCP stream) ends the
        // reader, which fires the Disconnected transition.
        drop(self.cmd_tx);
        let _ = self.writer.await;
        let _ = self.reader.await;
    }

    fn send(&self, cmd: ClientCommand) -> Result<(), ClientError> {
        if !self.is_connected() {
            return Err(ClientError::NotConnected);
        }
        self.cmd_tx
            .send(cmd)
            .map_err(|_| ClientError::ConnectionClosed)
    }

    /// Parks a reply slot for a request-style operation.
    async fn register(
        &self,
        slot: impl FnOnce(&mut Pending) -> &mut Option<PendingReply>,
        op: &'static str,
    ) -> Result<oneshot::Receiver<Result<Room, ClientError>>, ClientError>
    {
        if !self.is_connected() {
            return Err(ClientError::NotConnected);
        }
        let mut pending = self.shared.pending.lock().await;
        let slot = slot(&mut pending);
        if slot.is_some() {
            return Err(ClientError::RequestInFlight(op));
        }
        let (tx, rx) = oneshot::channel();
        *slot = Some(tx);
        Ok(rx)
    }

    /// Awaits the parked reply within the bounded wait.
    async fn wait(
        &self,
        rx: oneshot::Receiver<Result<Room, ClientError>>,
        slot: impl FnOnce(&mut Pending) -> &mut Option<PendingReply>,
        op: &'static str,
    ) -> Result<Room, ClientError> {
        match tokio::time::timeout(self.request_timeout, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(ClientError::ConnectionClosed),
            Err(_) => {
                // Clear the slot so a retry isn't refused as in-flight.
                let mut pending = self.shared.pending.lock().await;
                *slot(&mut pending) = None;
                Err(ClientError::Timeout(op))
            }
        }
    }
}

/// Applies one server event: snapshot upkeep, pending-reply resolution,
/// then fan-out to subscribers.
async fn handle_event(shared: &Arc<Shared>, event: ServerEvent) {
    match &event {
        ServerEvent::RoomCreated { room, .. } => {
            shared.room_tx.send_replace(Some(room.clone()));
            let mut pending = shared.pending.lock().await;
            if let Some(tx) = pending.create.take() {
                let _ = tx.send(Ok(room.clone()));
            }
        }
        ServerEvent::RoomJoined { room } => {
            shared.room_tx.send_replace(Some(room.clone()));
            let mut pending = shared.pending.lock().await;
            if let Some(tx) = pending.join.take() {
                let _ = tx.send(Ok(room.clone()));
            }
        }
        ServerEvent::PlayerJoined { room, .. }
        | ServerEvent::PlayerLeft { room, .. }
        | ServerEvent::PlayerReadyUpdate { room, .. }
        | ServerEvent::GameStarted { room, .. } => {
            shared.room_tx.send_replace(Some(room.clone()));
        }
        ServerEvent::RoomDeleted => {
            shared.room_tx.send_replace(None);
        }
        ServerEvent::AllPlayersReady => {}
        ServerEvent::Error { message } => {
            // The wire carries no request correlation, so an error
            // rejects whatever is waiting (matching the browser
            // client's behavior of wiring its error handler to every
            // in-flight request).
            let mut pending = shared.pending.lock().await;
            let pending = &mut *pending;
            for slot in [&mut pending.create, &mut pending.join] {
                if let Some(tx) = slot.take() {
                    let _ =
                        tx.send(Err(ClientError::Rejected(message.clone())));
                }
            }
        }
    }

    // Subscribers are optional; send errors just mean nobody listens.
    let _ = shared.event_tx.send(event);
}
