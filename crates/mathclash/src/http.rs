//! HTTP collaborator surface: status and room-lookup debug endpoints.
//!
//! Small and deliberately separate from the realtime path — ops checks
//! and debugging must keep working even while the gateway is busy. The
//! surface never mutates anything.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use mathclash_protocol::RoomCode;
use mathclash_store::{RoomStore, StoreError};
use serde::Serialize;
use serde_json::json;
use tower_http::trace::TraceLayer;

/// State shared by the HTTP handlers.
pub(crate) struct HttpState<S> {
    pub(crate) store: Arc<S>,
    pub(crate) started_at: Instant,
}

/// Builds the router for the collaborator surface.
pub(crate) fn router<S: RoomStore>(state: Arc<HttpState<S>>) -> Router {
    Router::new()
        .route("/api/status", get(status::<S>))
        .route("/api/rooms/{code}", get(room_debug::<S>))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusBody {
    status: &'static str,
    uptime_secs: u64,
    /// Whether multiplayer is currently on — i.e. the room store is
    /// reachable. Single-player play never depends on this.
    multiplayer: bool,
}

/// `GET /api/status` — liveness plus the multiplayer capability flag.
async fn status<S: RoomStore>(
    State(state): State<Arc<HttpState<S>>>,
) -> Json<StatusBody> {
    Json(StatusBody {
        status: "ok",
        uptime_secs: state.started_at.elapsed().as_secs(),
        multiplayer: state.store.available().await,
    })
}

/// `GET /api/rooms/{code}` — raw room JSON, for debugging only.
async fn room_debug<S: RoomStore>(
    State(state): State<Arc<HttpState<S>>>,
    Path(code): Path<String>,
) -> Response {
    let code = match RoomCode::parse(&code) {
        Ok(code) => code,
        Err(_) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "invalid room code" })),
            )
                .into_response();
        }
    };

    match state.store.get(&code).await {
        Ok(Some(room)) => Json(room).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "room not found" })),
        )
            .into_response(),
        Err(StoreError::Unavailable) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "error": "multiplayer is currently unavailable" })),
        )
            .into_response(),
        Err(e) => {
            tracing::error!(%code, error = %e, "room lookup failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "internal error" })),
            )
                .into_response()
        }
    }
}
