use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use crate::error::{Result, StoreError};
use crate::types::{Course, Session, SessionStatus};

/// `createCourseWithSession(teacherId, title, joinCode) -> (Course, Session)`
/// (§4.2, §4.4). Rejects a duplicate `joinCode`/active-course collision so
/// the Room Registry can retry with a freshly generated code; the store
/// owns the uniqueness guarantee via the partial unique index on `sessions`.
pub fn create_course_with_session(
    conn: &Connection,
    teacher_id: &str,
    title: &str,
    join_code: &str,
    max_swap_requests: u32,
) -> Result<(Course, Session)> {
    if find_active_session_by_join_code(conn, join_code)?.is_some() {
        return Err(StoreError::Conflict(format!(
            "join code {join_code} already active"
        )));
    }

    let now = Utc::now().to_rfc3339();
    let course = Course {
        id: Uuid::now_v7().to_string(),
        teacher_id: teacher_id.to_string(),
        title: title.to_string(),
        join_code: join_code.to_string(),
    };
    conn.execute(
        "INSERT INTO courses (id, teacher_id, title, join_code) VALUES (?1,?2,?3,?4)",
        params![course.id, course.teacher_id, course.title, course.join_code],
    )?;

    let session = Session {
        id: Uuid::now_v7().to_string(),
        course_id: course.id.clone(),
        status: SessionStatus::Active,
        max_swap_requests,
        created_at: now,
        ended_at: None,
    };
    // The partial unique index (course_id WHERE status='ACTIVE') guards against
    // this course ever getting a second active session; join-code uniqueness
    // itself rests on the pre-check above plus the single shared connection's
    // mutex serializing every store call, so no two creates interleave.
    conn.execute(
        "INSERT INTO sessions (id, course_id, status, max_swap_requests, created_at, ended_at)
         VALUES (?1,?2,'ACTIVE',?3,?4,NULL)",
        params![
            session.id,
            session.course_id,
            session.max_swap_requests,
            session.created_at,
        ],
    )
    .map_err(|e| match e {
        rusqlite::Error::SqliteFailure(ref sf, _)
            if sf.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            StoreError::Conflict(format!("join code {join_code} already active"))
        }
        other => StoreError::Database(other),
    })?;

    Ok((course, session))
}

/// `findActiveSessionByJoinCode(joinCode) -> Session?` (§4.2).
pub fn find_active_session_by_join_code(
    conn: &Connection,
    join_code: &str,
) -> Result<Option<(Course, Session)>> {
    let mut stmt = conn.prepare(
        "SELECT c.id, c.teacher_id, c.title, c.join_code,
                s.id, s.course_id, s.status, s.max_swap_requests, s.created_at, s.ended_at
         FROM courses c JOIN sessions s ON s.course_id = c.id
         WHERE c.join_code = ?1 AND s.status = 'ACTIVE'",
    )?;
    let row = stmt
        .query_row(params![join_code], |row| {
            let course = Course {
                id: row.get(0)?,
                teacher_id: row.get(1)?,
                title: row.get(2)?,
                join_code: row.get(3)?,
            };
            let session = Session {
                id: row.get(4)?,
                course_id: row.get(5)?,
                status: SessionStatus::Active,
                max_swap_requests: row.get(7)?,
                created_at: row.get(8)?,
                ended_at: row.get(9)?,
            };
            Ok((course, session))
        })
        .optional()?;
    Ok(row)
}

/// `completeSession(sessionId)` (§4.2).
pub fn complete_session(conn: &Connection, session_id: &str) -> Result<()> {
    let now = Utc::now().to_rfc3339();
    let rows = conn.execute(
        "UPDATE sessions SET status='COMPLETED', ended_at=?2 WHERE id=?1 AND status='ACTIVE'",
        params![session_id, now],
    )?;
    if rows == 0 {
        return Err(StoreError::NotFound(format!(
            "no active session {session_id}"
        )));
    }
    Ok(())
}

/// Update `Session.maxSwapRequests` (§4.9 `UPDATE_SESSION_SETTINGS`).
pub fn update_max_swap_requests(
    conn: &Connection,
    session_id: &str,
    max_swap_requests: u32,
) -> Result<()> {
    let rows = conn.execute(
        "UPDATE sessions SET max_swap_requests=?2 WHERE id=?1",
        params![session_id, max_swap_requests],
    )?;
    if rows == 0 {
        return Err(StoreError::NotFound(format!("no session {session_id}")));
    }
    Ok(())
}

/// All ACTIVE sessions, with course title and prompt-use count, for the
/// Admin Projection (§4.8).
pub fn list_active_sessions_with_course(
    conn: &Connection,
) -> Result<Vec<(Course, Session, u64)>> {
    let mut stmt = conn.prepare(
        "SELECT c.id, c.teacher_id, c.title, c.join_code,
                s.id, s.course_id, s.status, s.max_swap_requests, s.created_at, s.ended_at,
                (SELECT COUNT(*) FROM prompt_uses p WHERE p.session_id = s.id)
         FROM courses c JOIN sessions s ON s.course_id = c.id
         WHERE s.status = 'ACTIVE'",
    )?;
    let rows = stmt
        .query_map(params![], |row| {
            let course = Course {
                id: row.get(0)?,
                teacher_id: row.get(1)?,
                title: row.get(2)?,
                join_code: row.get(3)?,
            };
            let session = Session {
                id: row.get(4)?,
                course_id: row.get(5)?,
                status: SessionStatus::Active,
                max_swap_requests: row.get(7)?,
                created_at: row.get(8)?,
                ended_at: row.get(9)?,
            };
            let prompt_count: u64 = row.get(10)?;
            Ok((course, session, prompt_count))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Every session for a given teacher (`GET_PREVIOUS_SESSIONS`, §6), newest first.
pub fn list_sessions_for_teacher(conn: &Connection, teacher_id: &str) -> Result<Vec<(Course, Session)>> {
    let mut stmt = conn.prepare(
        "SELECT c.id, c.teacher_id, c.title, c.join_code,
                s.id, s.course_id, s.status, s.max_swap_requests, s.created_at, s.ended_at
         FROM courses c JOIN sessions s ON s.course_id = c.id
         WHERE c.teacher_id = ?1
         ORDER BY s.created_at DESC",
    )?;
    let rows = stmt
        .query_map(params![teacher_id], |row| {
            let course = Course {
                id: row.get(0)?,
                teacher_id: row.get(1)?,
                title: row.get(2)?,
                join_code: row.get(3)?,
            };
            let status = match row.get::<_, String>(6)?.as_str() {
                "COMPLETED" => SessionStatus::Completed,
                _ => SessionStatus::Active,
            };
            let session = Session {
                id: row.get(4)?,
                course_id: row.get(5)?,
                status,
                max_swap_requests: row.get(7)?,
                created_at: row.get(8)?,
                ended_at: row.get(9)?,
            };
            Ok((course, session))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::users::upsert_user;
    use thoughtswap_core::UserRole;

    fn memdb() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::init_db(&conn).unwrap();
        conn
    }

    #[test]
    fn duplicate_active_join_code_is_rejected() {
        let conn = memdb();
        let teacher = upsert_user(&conn, None, "t@school.edu", "T", UserRole::Teacher).unwrap();
        create_course_with_session(&conn, &teacher.id, "Period 3", "ABC123", 1).unwrap();
        let err = create_course_with_session(&conn, &teacher.id, "Period 4", "ABC123", 1);
        assert!(matches!(err, Err(StoreError::Conflict(_))));
    }

    #[test]
    fn complete_then_recreate_same_code_succeeds() {
        let conn = memdb();
        let teacher = upsert_user(&conn, None, "t@school.edu", "T", UserRole::Teacher).unwrap();
        let (_course, session) =
            create_course_with_session(&conn, &teacher.id, "Period 3", "ABC123", 1).unwrap();
        complete_session(&conn, &session.id).unwrap();
        let recreated = create_course_with_session(&conn, &teacher.id, "Period 3", "ABC123", 1);
        assert!(recreated.is_ok());
    }
}
