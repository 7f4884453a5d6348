use rusqlite::{Connection, Result};
use std::str::FromStr;
use thoughtswap_core::{PromptKind, UserRole};

use crate::types::{
    Course, LogEvent, PromptUse, SavedPrompt, Session, SessionStatus, SwapRequest, Thought, User,
};

pub(crate) fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    let role = UserRole::from_str(&row.get::<_, String>(4)?).unwrap_or(UserRole::Student);
    Ok(User {
        id: row.get(0)?,
        external_id: row.get(1)?,
        email: row.get(2)?,
        name: row.get(3)?,
        role,
        consent_given: row.get::<_, i32>(5)? != 0,
        consent_date: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
        last_seen_at: row.get(9)?,
    })
}

pub(crate) fn row_to_saved_prompt(row: &rusqlite::Row<'_>) -> rusqlite::Result<SavedPrompt> {
    let kind = PromptKind::from_str(&row.get::<_, String>(3)?).unwrap_or(PromptKind::Text);
    let options: Vec<String> = serde_json::from_str(&row.get::<_, String>(4)?).unwrap_or_default();
    Ok(SavedPrompt {
        id: row.get(0)?,
        teacher_id: row.get(1)?,
        content: row.get(2)?,
        kind,
        options,
        created_at: row.get(5)?,
    })
}

pub(crate) fn row_to_course(row: &rusqlite::Row<'_>) -> rusqlite::Result<Course> {
    Ok(Course {
        id: row.get(0)?,
        teacher_id: row.get(1)?,
        title: row.get(2)?,
        join_code: row.get(3)?,
    })
}

pub(crate) fn row_to_session(row: &rusqlite::Row<'_>) -> rusqlite::Result<Session> {
    let status = match row.get::<_, String>(2)?.as_str() {
        "COMPLETED" => SessionStatus::Completed,
        _ => SessionStatus::Active,
    };
    Ok(Session {
        id: row.get(0)?,
        course_id: row.get(1)?,
        status,
        max_swap_requests: row.get(3)?,
        created_at: row.get(4)?,
        ended_at: row.get(5)?,
    })
}

pub(crate) fn row_to_prompt_use(row: &rusqlite::Row<'_>) -> rusqlite::Result<PromptUse> {
    let kind = PromptKind::from_str(&row.get::<_, String>(3)?).unwrap_or(PromptKind::Text);
    let options: Vec<String> = serde_json::from_str(&row.get::<_, String>(4)?).unwrap_or_default();
    Ok(PromptUse {
        id: row.get(0)?,
        session_id: row.get(1)?,
        content: row.get(2)?,
        kind,
        options,
        created_at: row.get(5)?,
    })
}

pub(crate) fn row_to_thought(row: &rusqlite::Row<'_>) -> rusqlite::Result<Thought> {
    Ok(Thought {
        id: row.get(0)?,
        prompt_use_id: row.get(1)?,
        author_id: row.get(2)?,
        content: row.get(3)?,
        created_at: row.get(4)?,
        deleted_at: row.get(5)?,
    })
}

pub(crate) fn row_to_swap_request(row: &rusqlite::Row<'_>) -> rusqlite::Result<SwapRequest> {
    Ok(SwapRequest {
        id: row.get(0)?,
        student_id: row.get(1)?,
        session_id: row.get(2)?,
        created_at: row.get(3)?,
    })
}

pub(crate) fn row_to_log_event(row: &rusqlite::Row<'_>) -> rusqlite::Result<LogEvent> {
    let payload: serde_json::Value =
        serde_json::from_str(&row.get::<_, String>(3)?).unwrap_or(serde_json::Value::Null);
    Ok(LogEvent {
        id: row.get(0)?,
        event: row.get(1)?,
        user_id: row.get(2)?,
        payload,
        created_at: row.get(4)?,
    })
}

/// Initialise every table the core needs (§3). Safe to call on every
/// startup — CREATE IF NOT EXISTS means it's idempotent.
pub fn init_db(conn: &Connection) -> Result<()> {
    create_users_table(conn)?;
    create_saved_prompts_table(conn)?;
    create_courses_table(conn)?;
    create_sessions_table(conn)?;
    create_prompt_uses_table(conn)?;
    create_thoughts_table(conn)?;
    create_swap_requests_table(conn)?;
    create_log_events_table(conn)?;
    Ok(())
}

fn create_users_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS users (
            id              TEXT PRIMARY KEY NOT NULL,
            external_id     TEXT UNIQUE,
            email           TEXT NOT NULL UNIQUE,
            name            TEXT NOT NULL,
            role            TEXT NOT NULL DEFAULT 'STUDENT',
            consent_given   INTEGER NOT NULL DEFAULT 0,
            consent_date    TEXT,
            created_at      TEXT NOT NULL,
            updated_at      TEXT NOT NULL,
            last_seen_at    TEXT NOT NULL
        );",
    )
}

fn create_saved_prompts_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS saved_prompts (
            id          TEXT PRIMARY KEY NOT NULL,
            teacher_id  TEXT NOT NULL REFERENCES users(id),
            content     TEXT NOT NULL,
            type        TEXT NOT NULL,
            options     TEXT NOT NULL DEFAULT '[]',
            created_at  TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_saved_prompts_teacher ON saved_prompts (teacher_id);",
    )
}

fn create_courses_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS courses (
            id          TEXT PRIMARY KEY NOT NULL,
            teacher_id  TEXT NOT NULL REFERENCES users(id),
            title       TEXT NOT NULL,
            join_code   TEXT NOT NULL
        );",
    )
}

fn create_sessions_table(conn: &Connection) -> Result<()> {
    // Partial unique index enforces "at most one ACTIVE Session per Course"
    // and "joinCode unique across ACTIVE Sessions" (§3 global invariants) at
    // the storage layer, not just in application logic.
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS sessions (
            id                  TEXT PRIMARY KEY NOT NULL,
            course_id           TEXT NOT NULL REFERENCES courses(id),
            status              TEXT NOT NULL DEFAULT 'ACTIVE',
            max_swap_requests   INTEGER NOT NULL DEFAULT 1,
            created_at          TEXT NOT NULL,
            ended_at            TEXT
        );
        CREATE UNIQUE INDEX IF NOT EXISTS idx_sessions_one_active_per_course
            ON sessions (course_id) WHERE status = 'ACTIVE';",
    )
}

fn create_prompt_uses_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS prompt_uses (
            id          TEXT PRIMARY KEY NOT NULL,
            session_id  TEXT NOT NULL REFERENCES sessions(id),
            content     TEXT NOT NULL,
            type        TEXT NOT NULL,
            options     TEXT NOT NULL DEFAULT '[]',
            created_at  TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_prompt_uses_session ON prompt_uses (session_id, created_at);",
    )
}

fn create_thoughts_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS thoughts (
            id              TEXT PRIMARY KEY NOT NULL,
            prompt_use_id   TEXT NOT NULL REFERENCES prompt_uses(id),
            author_id       TEXT NOT NULL REFERENCES users(id),
            content         TEXT NOT NULL,
            created_at      TEXT NOT NULL,
            deleted_at      TEXT
        );
        CREATE UNIQUE INDEX IF NOT EXISTS idx_thoughts_one_live_per_author
            ON thoughts (prompt_use_id, author_id) WHERE deleted_at IS NULL;",
    )
}

fn create_swap_requests_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS swap_requests (
            id          TEXT PRIMARY KEY NOT NULL,
            student_id  TEXT NOT NULL REFERENCES users(id),
            session_id  TEXT NOT NULL REFERENCES sessions(id),
            created_at  TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_swap_requests_student_session
            ON swap_requests (student_id, session_id);",
    )
}

fn create_log_events_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS log_events (
            id          TEXT PRIMARY KEY NOT NULL,
            event       TEXT NOT NULL,
            user_id     TEXT,
            payload     TEXT NOT NULL DEFAULT '{}',
            created_at  TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_log_events_created ON log_events (created_at DESC);",
    )
}
