use chrono::Utc;
use rusqlite::{params, Connection};
use thoughtswap_core::PromptKind;
use uuid::Uuid;

use crate::error::{Result, StoreError};
use crate::types::SavedPrompt;

/// Saved-prompt CRUD scoped by `teacherId` (§4.2). Every operation here is
/// owner-scoped — the WHERE clause on `teacher_id` is the enforcement point
/// for "owned exclusively by the teacher; deletion forbidden for non-owners"
/// (§3 SavedPrompt), not a separate authorization layer.
pub fn create_saved_prompt(
    conn: &Connection,
    teacher_id: &str,
    content: &str,
    kind: PromptKind,
    options: &[String],
) -> Result<SavedPrompt> {
    let prompt = SavedPrompt {
        id: Uuid::now_v7().to_string(),
        teacher_id: teacher_id.to_string(),
        content: content.to_string(),
        kind,
        options: options.to_vec(),
        created_at: Utc::now().to_rfc3339(),
    };
    conn.execute(
        "INSERT INTO saved_prompts (id, teacher_id, content, type, options, created_at)
         VALUES (?1,?2,?3,?4,?5,?6)",
        params![
            prompt.id,
            prompt.teacher_id,
            prompt.content,
            prompt.kind.to_string(),
            serde_json::to_string(&prompt.options)?,
            prompt.created_at,
        ],
    )?;
    Ok(prompt)
}

pub fn list_saved_prompts(conn: &Connection, teacher_id: &str) -> Result<Vec<SavedPrompt>> {
    let mut stmt = conn.prepare(
        "SELECT id, teacher_id, content, type, options, created_at
         FROM saved_prompts WHERE teacher_id = ?1 ORDER BY created_at DESC",
    )?;
    let rows = stmt
        .query_map(params![teacher_id], crate::db::row_to_saved_prompt)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn delete_saved_prompt(conn: &Connection, teacher_id: &str, prompt_id: &str) -> Result<()> {
    let rows = conn.execute(
        "DELETE FROM saved_prompts WHERE id = ?1 AND teacher_id = ?2",
        params![prompt_id, teacher_id],
    )?;
    if rows == 0 {
        return Err(StoreError::NotFound(format!(
            "saved prompt {prompt_id} not owned by {teacher_id}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::users::upsert_user;
    use thoughtswap_core::UserRole;

    #[test]
    fn delete_is_scoped_to_owner() {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::init_db(&conn).unwrap();
        let teacher = upsert_user(&conn, None, "t@school.edu", "T", UserRole::Teacher).unwrap();
        let other = upsert_user(&conn, None, "t2@school.edu", "T2", UserRole::Teacher).unwrap();
        let prompt =
            create_saved_prompt(&conn, &teacher.id, "Why?", PromptKind::Text, &[]).unwrap();

        let err = delete_saved_prompt(&conn, &other.id, &prompt.id);
        assert!(matches!(err, Err(StoreError::NotFound(_))));

        delete_saved_prompt(&conn, &teacher.id, &prompt.id).unwrap();
        assert!(list_saved_prompts(&conn, &teacher.id).unwrap().is_empty());
    }
}
