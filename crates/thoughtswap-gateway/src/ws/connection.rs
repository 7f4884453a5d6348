//! Per-connection task — lives for the entire WS session (§4.1, §4.3).
//!
//! Identity resolves synchronously from the upgrade's query parameters
//! *before* the event loop starts: `GET /ws?email=...&name=...&role=...`.
//! This trivially satisfies the ordering guarantee in §4.3 ("no command is
//! processed before identity resolves") without a separate per-connection
//! handshake frame or readiness latch — there is simply nothing to race.

use axum::{
    extract::{ws::Message, ws::WebSocket, Query, State, WebSocketUpgrade},
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use thoughtswap_core::config::{HEARTBEAT_INTERVAL_SECS, MAX_PAYLOAD_BYTES};
use thoughtswap_core::{ConnId, JoinCode, UserRole};
use thoughtswap_protocol::{events, ConsentStatus, ErrorPayload, IdentityHint, InboundEvent, OutboundEvent};
use thoughtswap_store::types::User;

use crate::app::AppState;
use crate::ws::{dispatch, send};

/// Mutable per-connection context, threaded through every dispatched command
/// so a handler can learn the resolved room (`JOIN_ROOM`/`TEACHER_START_CLASS`)
/// without a round trip through shared state.
pub struct ConnContext {
    pub conn_id: ConnId,
    pub user: User,
    pub join_code: Option<JoinCode>,
}

#[derive(Debug, Deserialize)]
pub struct ConnectQuery {
    pub email: String,
    pub name: String,
    pub role: UserRole,
}

/// `GET /ws?email=...&name=...&role=...` — the only entry point into the
/// event protocol (§6).
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(params): Query<ConnectQuery>,
) -> impl IntoResponse {
    let hint = IdentityHint {
        email: params.email,
        name: params.name,
        role: params.role,
    };
    ws.on_upgrade(move |socket| handle_connection(socket, state, hint))
}

async fn handle_connection(socket: WebSocket, state: Arc<AppState>, hint: IdentityHint) {
    let (mut tx, mut rx) = socket.split();

    let user = match state.identity.resolve(&hint) {
        Ok(user) => user,
        Err(e) => {
            warn!(email = %hint.email, error = %e, "identity resolution failed");
            let event = OutboundEvent::new(events::AUTH_ERROR, ErrorPayload::new(e.to_string()));
            let _ = send::json(&mut tx, &event).await;
            return;
        }
    };

    let conn_id = ConnId::new();
    info!(conn_id = %conn_id, user_id = %user.id, role = %user.role, "connection authenticated");

    {
        let conn = state.db.lock().unwrap();
        thoughtswap_room::logger::log(&conn, events::LOG_USER_CONNECT, Some(&user.id), serde_json::json!({}));
    }

    let consent_status = OutboundEvent::new(
        events::CONSENT_STATUS,
        ConsentStatus {
            consent_given: user.consent_given,
            consent_date: user.consent_date.clone(),
        },
    );
    if send::json(&mut tx, &consent_status).await.is_err() {
        return;
    }

    let mut ctx = ConnContext {
        conn_id: conn_id.clone(),
        user,
        join_code: None,
    };
    let mut outbox = state.connections.register(conn_id.clone());

    let mut heartbeat = tokio::time::interval(Duration::from_secs(HEARTBEAT_INTERVAL_SECS));
    heartbeat.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            msg = rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let text_ref: &str = &text;
                        if text_ref.len() > MAX_PAYLOAD_BYTES {
                            warn!(conn_id = %ctx.conn_id, size = text_ref.len(), "payload too large, closing connection");
                            break;
                        }
                        match serde_json::from_str::<InboundEvent>(text_ref) {
                            Ok(frame) => dispatch::route(frame, &state, &mut ctx),
                            Err(e) => warn!(conn_id = %ctx.conn_id, error = %e, "malformed frame, dropping"),
                        }
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if tx.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!(conn_id = %ctx.conn_id, error = %e, "ws error");
                        break;
                    }
                }
            }

            outbound = outbox.recv() => {
                match outbound {
                    Some(event) => {
                        if send::json(&mut tx, &event).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }

            _ = heartbeat.tick() => {
                if tx.send(Message::Ping(Vec::new().into())).await.is_err() {
                    break;
                }
            }
        }
    }

    state.connections.unregister(&ctx.conn_id);
    if let Some(join_code) = ctx.join_code.take() {
        match state.registry.leave(&join_code, &ctx.conn_id) {
            Ok(outcome) => {
                if let Some(room) = state.registry.get(&join_code) {
                    state.connections.deliver(&room.participants(), &outcome);
                }
            }
            Err(e) => warn!(conn_id = %ctx.conn_id, error = %e, "leave failed"),
        }
    }
    info!(conn_id = %ctx.conn_id, "connection closed");
}
