use chrono::Utc;
use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::error::Result;
use crate::types::SwapRequest;

/// `countSwapRequests(studentId, sessionId) -> int` (§4.2). Checked against
/// `Session.maxSwapRequests` before granting a re-swap (§4.5, §8 invariant 3).
pub fn count_swap_requests(conn: &Connection, student_id: &str, session_id: &str) -> Result<u32> {
    let count: u32 = conn.query_row(
        "SELECT COUNT(*) FROM swap_requests WHERE student_id = ?1 AND session_id = ?2",
        params![student_id, session_id],
        |row| row.get(0),
    )?;
    Ok(count)
}

/// `recordSwapRequest(studentId, sessionId)` (§4.2).
pub fn record_swap_request(conn: &Connection, student_id: &str, session_id: &str) -> Result<SwapRequest> {
    let request = SwapRequest {
        id: Uuid::now_v7().to_string(),
        student_id: student_id.to_string(),
        session_id: session_id.to_string(),
        created_at: Utc::now().to_rfc3339(),
    };
    conn.execute(
        "INSERT INTO swap_requests (id, student_id, session_id, created_at) VALUES (?1,?2,?3,?4)",
        params![request.id, request.student_id, request.session_id, request.created_at],
    )?;
    Ok(request)
}

/// Every SwapRequest whose author has consented — the `swaps` slice of the
/// Admin Projection (§4.8).
pub fn list_consented_swap_requests(conn: &Connection) -> Result<Vec<SwapRequest>> {
    let mut stmt = conn.prepare(
        "SELECT r.id, r.student_id, r.session_id, r.created_at
         FROM swap_requests r JOIN users u ON u.id = r.student_id
         WHERE u.consent_given = 1
         ORDER BY r.created_at DESC",
    )?;
    let rows = stmt
        .query_map(params![], crate::db::row_to_swap_request)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::courses::create_course_with_session;
    use crate::users::upsert_user;
    use thoughtswap_core::UserRole;

    #[test]
    fn quota_counts_only_this_student_and_session() {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::init_db(&conn).unwrap();
        let teacher = upsert_user(&conn, None, "t@school.edu", "T", UserRole::Teacher).unwrap();
        let s1 = upsert_user(&conn, None, "s1@school.edu", "S1", UserRole::Student).unwrap();
        let s2 = upsert_user(&conn, None, "s2@school.edu", "S2", UserRole::Student).unwrap();
        let (_c, session) =
            create_course_with_session(&conn, &teacher.id, "Period 3", "ABC123", 1).unwrap();

        record_swap_request(&conn, &s1.id, &session.id).unwrap();
        assert_eq!(count_swap_requests(&conn, &s1.id, &session.id).unwrap(), 1);
        assert_eq!(count_swap_requests(&conn, &s2.id, &session.id).unwrap(), 0);
    }
}
