//! The Event Logger (§4.7): best-effort append of domain events to the
//! store. Failures never surface to clients — they're logged to stderr via
//! `tracing` and swallowed, matching §4.2's "store failures are non-fatal
//! for logging only."

use rusqlite::Connection;
use serde_json::Value;
use tracing::warn;

/// Takes an already-locked `Connection` — callers hold the store mutex for
/// the rest of their command anyway, and locking it twice on the same
/// thread would deadlock (`std::sync::Mutex` isn't reentrant).
pub fn log(conn: &Connection, event: &str, user_id: Option<&str>, payload: Value) {
    if let Err(e) = thoughtswap_store::logs::append_log_event(conn, event, user_id, payload) {
        warn!(event, error = %e, "failed to append log event");
    }
}
