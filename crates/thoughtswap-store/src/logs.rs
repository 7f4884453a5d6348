use chrono::Utc;
use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::error::Result;
use crate::types::LogEvent;

/// `appendLogEvent(...)` (§4.2, §4.7). Callers treat failures here as
/// non-fatal (§4.2's "store failures are non-fatal for logging only") — this
/// function itself still returns `Result` so the Event Logger decides how to
/// swallow it; it never panics.
pub fn append_log_event(
    conn: &Connection,
    event: &str,
    user_id: Option<&str>,
    payload: serde_json::Value,
) -> Result<LogEvent> {
    let log = LogEvent {
        id: Uuid::now_v7().to_string(),
        event: event.to_string(),
        user_id: user_id.map(str::to_string),
        payload,
        created_at: Utc::now().to_rfc3339(),
    };
    conn.execute(
        "INSERT INTO log_events (id, event, user_id, payload, created_at) VALUES (?1,?2,?3,?4,?5)",
        params![
            log.id,
            log.event,
            log.user_id,
            serde_json::to_string(&log.payload)?,
            log.created_at,
        ],
    )?;
    Ok(log)
}

/// Most recent `limit` LogEvents, newest first — the Admin Projection's
/// `logs` slice (§4.8, default window `ADMIN_LOG_WINDOW = 500`).
pub fn recent_log_events(conn: &Connection, limit: usize) -> Result<Vec<LogEvent>> {
    let mut stmt =
        conn.prepare("SELECT id, event, user_id, payload, created_at FROM log_events ORDER BY created_at DESC LIMIT ?1")?;
    let rows = stmt
        .query_map(params![limit as i64], crate::db::row_to_log_event)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_and_fetch_round_trips_payload() {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::init_db(&conn).unwrap();
        append_log_event(&conn, "JOIN_ROOM", None, serde_json::json!({"joinCode": "ABC123"}))
            .unwrap();
        let logs = recent_log_events(&conn, 10).unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].event, "JOIN_ROOM");
        assert_eq!(logs[0].payload["joinCode"], "ABC123");
    }
}
