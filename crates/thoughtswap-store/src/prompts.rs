use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use thoughtswap_core::PromptKind;
use uuid::Uuid;

use crate::error::Result;
use crate::types::PromptUse;

const PROMPT_USE_SELECT_SQL: &str =
    "SELECT id, session_id, content, type, options, created_at FROM prompt_uses";

/// `appendPromptUse(sessionId, content, type, options) -> PromptUse` (§4.2).
/// Immutable once created (§3); a Session's ordered history grows monotonically.
pub fn append_prompt_use(
    conn: &Connection,
    session_id: &str,
    content: &str,
    kind: PromptKind,
    options: &[String],
) -> Result<PromptUse> {
    let prompt_use = PromptUse {
        id: Uuid::now_v7().to_string(),
        session_id: session_id.to_string(),
        content: content.to_string(),
        kind,
        options: options.to_vec(),
        created_at: Utc::now().to_rfc3339(),
    };
    conn.execute(
        "INSERT INTO prompt_uses (id, session_id, content, type, options, created_at)
         VALUES (?1,?2,?3,?4,?5,?6)",
        params![
            prompt_use.id,
            prompt_use.session_id,
            prompt_use.content,
            prompt_use.kind.to_string(),
            serde_json::to_string(&prompt_use.options)?,
            prompt_use.created_at,
        ],
    )?;
    Ok(prompt_use)
}

/// `latestPromptUse(sessionId) -> PromptUse?` (§4.2). The "active" prompt is
/// the one most recently created for the Session.
pub fn latest_prompt_use(conn: &Connection, session_id: &str) -> Result<Option<PromptUse>> {
    let sql = format!("{PROMPT_USE_SELECT_SQL} WHERE session_id = ?1 ORDER BY created_at DESC LIMIT 1");
    let mut stmt = conn.prepare(&sql)?;
    let row = stmt
        .query_row(params![session_id], crate::db::row_to_prompt_use)
        .optional()?;
    Ok(row)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::courses::create_course_with_session;
    use crate::users::upsert_user;
    use thoughtswap_core::UserRole;

    fn memdb() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::init_db(&conn).unwrap();
        conn
    }

    #[test]
    fn latest_prompt_use_tracks_the_most_recent_append() {
        let conn = memdb();
        let teacher = upsert_user(&conn, None, "t@school.edu", "T", UserRole::Teacher).unwrap();
        let (_c, session) =
            create_course_with_session(&conn, &teacher.id, "Period 3", "ABC123", 1).unwrap();
        append_prompt_use(&conn, &session.id, "Why?", PromptKind::Text, &[]).unwrap();
        let second = append_prompt_use(&conn, &session.id, "How?", PromptKind::Text, &[]).unwrap();
        let latest = latest_prompt_use(&conn, &session.id).unwrap().unwrap();
        assert_eq!(latest.id, second.id);
    }
}
