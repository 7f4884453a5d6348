use axum::{extract::State, Json};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::app::AppState;

/// GET /health — liveness probe, reports live session/participant counts.
pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "protocol": thoughtswap_core::config::PROTOCOL_VERSION,
        "active_sessions": state.registry.active_session_count(),
        "total_participants": state.registry.total_participants(),
    }))
}
