use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use crate::error::{Result, StoreError};
use crate::types::{PromptUse, Thought, ThoughtWithAuthor};

/// `insertThought(promptUseId, authorId, content) -> Thought` (§4.2).
/// The partial unique index on `(prompt_use_id, author_id) WHERE deleted_at
/// IS NULL` enforces "at most one non-deleted Thought per author" (§3, §8
/// invariant 4) at the storage layer.
pub fn insert_thought(
    conn: &Connection,
    prompt_use_id: &str,
    author_id: &str,
    content: &str,
) -> Result<Thought> {
    let thought = Thought {
        id: Uuid::now_v7().to_string(),
        prompt_use_id: prompt_use_id.to_string(),
        author_id: author_id.to_string(),
        content: content.to_string(),
        created_at: Utc::now().to_rfc3339(),
        deleted_at: None,
    };
    conn.execute(
        "INSERT INTO thoughts (id, prompt_use_id, author_id, content, created_at, deleted_at)
         VALUES (?1,?2,?3,?4,?5,NULL)",
        params![
            thought.id,
            thought.prompt_use_id,
            thought.author_id,
            thought.content,
            thought.created_at,
        ],
    )
    .map_err(|e| match e {
        rusqlite::Error::SqliteFailure(ref sf, _)
            if sf.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            StoreError::Conflict(format!(
                "author {author_id} already submitted for prompt {prompt_use_id}"
            ))
        }
        other => StoreError::Database(other),
    })?;
    Ok(thought)
}

/// `deleteThought(thoughtId) -> (Thought, PromptUse)` (§4.2). Soft-delete:
/// `deleted_at` set, row retained for audit; the freed (promptUseId,
/// authorId) pair may be resubmitted (§8 scenario 4).
pub fn delete_thought(conn: &Connection, thought_id: &str) -> Result<(Thought, PromptUse)> {
    let now = Utc::now().to_rfc3339();
    let rows = conn.execute(
        "UPDATE thoughts SET deleted_at=?2 WHERE id=?1 AND deleted_at IS NULL",
        params![thought_id, now],
    )?;
    if rows == 0 {
        return Err(StoreError::NotFound(format!("thought {thought_id}")));
    }

    let mut stmt = conn.prepare(
        "SELECT id, prompt_use_id, author_id, content, created_at, deleted_at
         FROM thoughts WHERE id = ?1",
    )?;
    let thought = stmt
        .query_row(params![thought_id], crate::db::row_to_thought)
        .optional()?
        .ok_or_else(|| StoreError::NotFound(thought_id.to_string()))?;

    let mut pstmt = conn.prepare(
        "SELECT id, session_id, content, type, options, created_at
         FROM prompt_uses WHERE id = ?1",
    )?;
    let prompt_use = pstmt
        .query_row(params![thought.prompt_use_id], crate::db::row_to_prompt_use)
        .optional()?
        .ok_or_else(|| StoreError::NotFound(thought.prompt_use_id.clone()))?;

    Ok((thought, prompt_use))
}

/// `listThoughts(promptUseId) -> [Thought with author]` (§4.2). Only
/// non-deleted thoughts; joined with the author's name and consent flag so
/// callers (Room, Admin Projection) don't need a second round-trip.
pub fn list_thoughts(conn: &Connection, prompt_use_id: &str) -> Result<Vec<ThoughtWithAuthor>> {
    let mut stmt = conn.prepare(
        "SELECT t.id, t.prompt_use_id, t.author_id, t.content, t.created_at, t.deleted_at,
                u.name, u.consent_given
         FROM thoughts t JOIN users u ON u.id = t.author_id
         WHERE t.prompt_use_id = ?1 AND t.deleted_at IS NULL
         ORDER BY t.created_at ASC",
    )?;
    let rows = stmt
        .query_map(params![prompt_use_id], |row| {
            let thought = Thought {
                id: row.get(0)?,
                prompt_use_id: row.get(1)?,
                author_id: row.get(2)?,
                content: row.get(3)?,
                created_at: row.get(4)?,
                deleted_at: row.get(5)?,
            };
            Ok(ThoughtWithAuthor {
                thought,
                author_name: row.get(6)?,
                author_consent_given: row.get::<_, i32>(7)? != 0,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Every live (non-deleted) Thought whose author has consented, across all
/// sessions — the `thoughts` slice of the Admin Projection (§4.8).
pub fn list_consented_thoughts(conn: &Connection) -> Result<Vec<ThoughtWithAuthor>> {
    let mut stmt = conn.prepare(
        "SELECT t.id, t.prompt_use_id, t.author_id, t.content, t.created_at, t.deleted_at,
                u.name, u.consent_given
         FROM thoughts t JOIN users u ON u.id = t.author_id
         WHERE t.deleted_at IS NULL AND u.consent_given = 1
         ORDER BY t.created_at DESC",
    )?;
    let rows = stmt
        .query_map(params![], |row| {
            let thought = Thought {
                id: row.get(0)?,
                prompt_use_id: row.get(1)?,
                author_id: row.get(2)?,
                content: row.get(3)?,
                created_at: row.get(4)?,
                deleted_at: row.get(5)?,
            };
            Ok(ThoughtWithAuthor {
                thought,
                author_name: row.get(6)?,
                author_consent_given: row.get::<_, i32>(7)? != 0,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::courses::create_course_with_session;
    use crate::prompts::append_prompt_use;
    use crate::users::upsert_user;
    use thoughtswap_core::{PromptKind, UserRole};

    fn memdb() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::init_db(&conn).unwrap();
        conn
    }

    #[test]
    fn second_submission_from_same_author_conflicts() {
        let conn = memdb();
        let teacher = upsert_user(&conn, None, "t@school.edu", "T", UserRole::Teacher).unwrap();
        let student = upsert_user(&conn, None, "s1@school.edu", "S1", UserRole::Student).unwrap();
        let (_c, session) =
            create_course_with_session(&conn, &teacher.id, "Period 3", "ABC123", 1).unwrap();
        let pu = append_prompt_use(&conn, &session.id, "Why?", PromptKind::Text, &[]).unwrap();

        insert_thought(&conn, &pu.id, &student.id, "A").unwrap();
        let err = insert_thought(&conn, &pu.id, &student.id, "A2");
        assert!(matches!(err, Err(StoreError::Conflict(_))));
    }

    #[test]
    fn delete_then_resubmit_leaves_exactly_one_live_thought() {
        let conn = memdb();
        let teacher = upsert_user(&conn, None, "t@school.edu", "T", UserRole::Teacher).unwrap();
        let student = upsert_user(&conn, None, "s1@school.edu", "S1", UserRole::Student).unwrap();
        let (_c, session) =
            create_course_with_session(&conn, &teacher.id, "Period 3", "ABC123", 1).unwrap();
        let pu = append_prompt_use(&conn, &session.id, "Why?", PromptKind::Text, &[]).unwrap();

        let first = insert_thought(&conn, &pu.id, &student.id, "A").unwrap();
        delete_thought(&conn, &first.id).unwrap();
        insert_thought(&conn, &pu.id, &student.id, "A2").unwrap();

        let live = list_thoughts(&conn, &pu.id).unwrap();
        assert_eq!(live.len(), 1);
        assert_eq!(live[0].thought.content, "A2");
    }
}
