use chrono::Utc;
use rusqlite::{params, Connection};
use thoughtswap_core::UserRole;
use uuid::Uuid;

use crate::error::{Result, StoreError};
use crate::types::User;

const USER_SELECT_SQL: &str =
    "SELECT id, external_id, email, name, role, consent_given, consent_date,
            created_at, updated_at, last_seen_at
     FROM users WHERE id = ?1";

const USER_SELECT_BY_EMAIL_SQL: &str =
    "SELECT id, external_id, email, name, role, consent_given, consent_date,
            created_at, updated_at, last_seen_at
     FROM users WHERE email = ?1";

/// Load a user by primary key.
pub fn get_user(conn: &Connection, user_id: &str) -> Result<Option<User>> {
    let mut stmt = conn.prepare(USER_SELECT_SQL)?;
    match stmt.query_row(params![user_id], crate::db::row_to_user) {
        Ok(u) => Ok(Some(u)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(StoreError::Database(e)),
    }
}

/// Fetch an existing User by email. Used for the non-guest resolution path
/// (§4.3): absence here means authentication fails.
pub fn get_user_by_email(conn: &Connection, email: &str) -> Result<Option<User>> {
    let mut stmt = conn.prepare(USER_SELECT_BY_EMAIL_SQL)?;
    match stmt.query_row(params![email], crate::db::row_to_user) {
        Ok(u) => Ok(Some(u)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(StoreError::Database(e)),
    }
}

/// `upsertUser(externalId|email, fields) -> User` (§4.2). Guests are
/// identified by a synthesized `externalId`; re-running with the same email
/// updates name/role/external_id in place instead of duplicating the row.
pub fn upsert_user(
    conn: &Connection,
    external_id: Option<&str>,
    email: &str,
    name: &str,
    role: UserRole,
) -> Result<User> {
    let now = Utc::now().to_rfc3339();

    if let Some(existing) = get_user_by_email(conn, email)? {
        conn.execute(
            "UPDATE users SET external_id=?2, name=?3, role=?4, last_seen_at=?5, updated_at=?5
             WHERE id=?1",
            params![existing.id, external_id, name, role.to_string(), now],
        )?;
        return get_user(conn, &existing.id)?.ok_or(StoreError::NotFound(existing.id));
    }

    let user = User {
        id: Uuid::now_v7().to_string(),
        external_id: external_id.map(str::to_string),
        email: email.to_string(),
        name: name.to_string(),
        role,
        consent_given: false,
        consent_date: None,
        created_at: now.clone(),
        updated_at: now.clone(),
        last_seen_at: now.clone(),
    };
    conn.execute(
        "INSERT INTO users (id, external_id, email, name, role, consent_given, consent_date,
                             created_at, updated_at, last_seen_at)
         VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10)",
        params![
            user.id,
            user.external_id,
            user.email,
            user.name,
            user.role.to_string(),
            user.consent_given as i32,
            user.consent_date,
            user.created_at,
            user.updated_at,
            user.last_seen_at,
        ],
    )?;
    Ok(user)
}

/// `recordConsent(userId, bool, now) -> User` (§4.2).
pub fn record_consent(conn: &Connection, user_id: &str, consent_given: bool) -> Result<User> {
    let now = Utc::now().to_rfc3339();
    conn.execute(
        "UPDATE users SET consent_given=?2, consent_date=?3, updated_at=?3 WHERE id=?1",
        params![user_id, consent_given as i32, now],
    )?;
    get_user(conn, user_id)?.ok_or(StoreError::NotFound(user_id.to_string()))
}

/// Total registered users — the `stats.totalUsers` field of the Admin
/// Projection (§4.8).
pub fn count_users(conn: &Connection) -> Result<u64> {
    let count: u64 = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
    Ok(count)
}

/// Users who have given consent — `stats.totalConsented` (§4.8).
pub fn count_consented_users(conn: &Connection) -> Result<u64> {
    let count: u64 = conn.query_row(
        "SELECT COUNT(*) FROM users WHERE consent_given = 1",
        [],
        |row| row.get(0),
    )?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memdb() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::init_db(&conn).unwrap();
        conn
    }

    #[test]
    fn upsert_user_creates_then_updates_in_place() {
        let conn = memdb();
        let first =
            upsert_user(&conn, None, "t@school.edu", "Ms. Rivera", UserRole::Teacher).unwrap();
        let second =
            upsert_user(&conn, None, "t@school.edu", "Ms. R.", UserRole::Teacher).unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(second.name, "Ms. R.");
    }

    #[test]
    fn record_consent_is_idempotent_on_state() {
        let conn = memdb();
        let user = upsert_user(&conn, None, "s@school.edu", "S1", UserRole::Student).unwrap();
        let once = record_consent(&conn, &user.id, true).unwrap();
        let twice = record_consent(&conn, &user.id, true).unwrap();
        assert!(once.consent_given);
        assert!(twice.consent_given);
    }
}
