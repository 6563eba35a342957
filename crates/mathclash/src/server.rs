//! `Server` builder and accept loop.
//!
//! Ties the layers together: one WebSocket listener for the realtime
//! gateway, one HTTP listener for the status/debug surface, and the
//! shared state both hand to their handlers. Construct everything once
//! at process start and inject it — no module-level globals.

use std::sync::Arc;
use std::time::{Duration, Instant};

use mathclash_protocol::JsonCodec;
use mathclash_room::RoomManager;
use mathclash_store::{MemoryStore, RoomStore};
use mathclash_transport::WsListener;
use tokio::sync::Mutex;

use crate::GatewayError;
use crate::gateway::{GatewayState, Groups, handle_connection};
use crate::http::{self, HttpState};

/// How often the default in-process store sweeps expired rooms.
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Builder for configuring and starting a Mathclash server.
///
/// # Example
///
/// ```rust,no_run
/// use mathclash::ServerBuilder;
///
/// # async fn run() -> Result<(), mathclash::GatewayError> {
/// let server = ServerBuilder::new()
///     .bind("0.0.0.0:8090")
///     .http_bind("0.0.0.0:8091")
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct ServerBuilder {
    bind_addr: String,
    http_addr: String,
    multiplayer: bool,
}

impl ServerBuilder {
    /// Creates a builder with default settings.
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:8090".to_string(),
            http_addr: "127.0.0.1:8091".to_string(),
            multiplayer: true,
        }
    }

    /// Sets the WebSocket gateway address.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Sets the HTTP surface address.
    pub fn http_bind(mut self, addr: &str) -> Self {
        self.http_addr = addr.to_string();
        self
    }

    /// Turns multiplayer off: the store starts disabled and every room
    /// command fails with a capability error, while the status endpoint
    /// keeps answering. Mirrors deployments without a reachable store.
    pub fn multiplayer(mut self, enabled: bool) -> Self {
        self.multiplayer = enabled;
        self
    }

    /// Builds the server over the default in-process store.
    pub async fn build(self) -> Result<Server<MemoryStore>, GatewayError> {
        let store = if self.multiplayer {
            Arc::new(MemoryStore::new())
        } else {
            Arc::new(MemoryStore::disabled())
        };
        Arc::clone(&store).spawn_sweeper(SWEEP_INTERVAL);
        self.build_with_store(store).await
    }

    /// Builds the server over an injected store. Tests use this to
    /// share the store with assertions or to flip availability.
    pub async fn build_with_store<S: RoomStore>(
        self,
        store: Arc<S>,
    ) -> Result<Server<S>, GatewayError> {
        let listener = WsListener::bind(&self.bind_addr).await?;
        let http_listener = tokio::net::TcpListener::bind(&self.http_addr)
            .await
            .map_err(GatewayError::Http)?;
        tracing::info!(addr = %self.http_addr, "HTTP surface bound");

        let state = Arc::new(GatewayState {
            rooms: RoomManager::new(Arc::clone(&store)),
            codec: JsonCodec,
            groups: Mutex::new(Groups::default()),
        });

        Ok(Server {
            listener,
            http_listener,
            store,
            state,
            started_at: Instant::now(),
        })
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A running Mathclash server.
///
/// Call [`run()`](Self::run) to start accepting connections. The future
/// completes on the shutdown signal (ctrl-c).
pub struct Server<S> {
    listener: WsListener,
    http_listener: tokio::net::TcpListener,
    store: Arc<S>,
    state: Arc<GatewayState<S>>,
    started_at: Instant,
}

impl<S: RoomStore> Server<S> {
    /// Creates a new builder.
    pub fn builder() -> ServerBuilder {
        ServerBuilder::new()
    }

    /// The gateway's local address. Useful when bound to port 0.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.listener.local_addr()
    }

    /// The HTTP surface's local address.
    pub fn http_local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.http_listener.local_addr()
    }

    /// Runs the server until the shutdown signal fires.
    ///
    /// The HTTP surface is served on its own task; the accept loop
    /// spawns one handler task per gateway connection.
    pub async fn run(mut self) -> Result<(), GatewayError> {
        let http_state = Arc::new(HttpState {
            store: Arc::clone(&self.store),
            started_at: self.started_at,
        });
        let app = http::router(http_state);
        let http_listener = self.http_listener;
        tokio::spawn(async move {
            if let Err(e) = axum::serve(http_listener, app).await {
                tracing::error!(error = %e, "http surface failed");
            }
        });

        tracing::info!("mathclash server running");

        let shutdown = tokio::signal::ctrl_c();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                accepted = self.listener.accept() => match accepted {
                    Ok(conn) => {
                        let state = Arc::clone(&self.state);
                        tokio::spawn(handle_connection(conn, state));
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "accept failed");
                    }
                },
                _ = &mut shutdown => {
                    tracing::info!("shutdown signal received");
                    break;
                }
            }
        }

        Ok(())
    }
}
