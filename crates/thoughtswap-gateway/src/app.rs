use std::sync::{Arc, Mutex};

use axum::{routing::get, Router};
use rusqlite::Connection;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::warn;

use thoughtswap_core::config::ThoughtSwapConfig;
use thoughtswap_identity::IdentityResolver;
use thoughtswap_room::{AutoEndMessage, RoomRegistry};

use crate::ws::broadcast::ConnectionRegistry;

/// Central shared state — passed as `Arc<AppState>` to every Axum handler.
pub struct AppState {
    pub config: ThoughtSwapConfig,
    pub db: Arc<Mutex<Connection>>,
    pub identity: IdentityResolver,
    pub registry: RoomRegistry,
    pub connections: ConnectionRegistry,
}

impl AppState {
    pub fn new(
        config: ThoughtSwapConfig,
        db: Arc<Mutex<Connection>>,
        identity: IdentityResolver,
        registry: RoomRegistry,
    ) -> Self {
        Self {
            config,
            db,
            identity,
            registry,
            connections: ConnectionRegistry::new(),
        }
    }
}

/// Consumes the debounced teacher-disconnect auto-end messages the
/// `RoomRegistry` produces (§4.9) and delivers the `SESSION_ENDED` broadcast
/// to whatever connections were still in the room at the moment it fired.
pub async fn drive_auto_end(state: Arc<AppState>, mut rx: UnboundedReceiver<AutoEndMessage>) {
    while let Some((join_code, participants, outcome)) = rx.recv().await {
        warn!(%join_code, "session auto-ended after teacher disconnect");
        state.connections.deliver(&participants, &outcome);
    }
}

/// Assemble the full Axum router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(crate::http::health::health_handler))
        .route("/auth/callback", get(crate::http::oauth::callback_handler))
        .route("/ws", get(crate::ws::connection::ws_handler))
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}
