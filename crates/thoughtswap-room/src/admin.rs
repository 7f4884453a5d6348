//! The Admin Projection (§4.8): a read-only snapshot across every Course,
//! filtered to consented authors, for `ADMIN_GET_DATA`. Pure aggregation —
//! no mutation, no Room involvement beyond the Registry's own counters.

use std::sync::Mutex;

use rusqlite::Connection;

use thoughtswap_core::config::ADMIN_LOG_WINDOW;
use thoughtswap_protocol::payloads::{
    AdminDataPayload, AdminLogView, AdminSessionView, AdminStats, AdminSwapView, AdminThoughtView,
};

use crate::error::{CoreError, Result};
use crate::registry::RoomRegistry;

/// Build the full `ADMIN_GET_DATA` response (§4.8): aggregate counters plus
/// every consented Thought and SwapRequest across all Courses, plus the most
/// recent `ADMIN_LOG_WINDOW` LogEvents.
pub fn build_snapshot(db: &Mutex<Connection>, registry: &RoomRegistry) -> Result<AdminDataPayload> {
    let conn = db.lock().unwrap();

    let total_users = thoughtswap_store::users::count_users(&conn).map_err(CoreError::from)?;
    let total_consented =
        thoughtswap_store::users::count_consented_users(&conn).map_err(CoreError::from)?;

    let sessions = thoughtswap_store::courses::list_active_sessions_with_course(&conn)
        .map_err(CoreError::from)?
        .into_iter()
        .map(|(course, session, prompt_count)| AdminSessionView {
            session_id: session.id,
            join_code: course.join_code,
            title: course.title,
            prompt_count,
            created_at: session.created_at,
        })
        .collect();

    let thoughts = thoughtswap_store::thoughts::list_consented_thoughts(&conn)
        .map_err(CoreError::from)?
        .into_iter()
        .map(|t| AdminThoughtView {
            id: t.thought.id,
            content: t.thought.content,
            author_name: t.author_name,
            prompt_use_id: t.thought.prompt_use_id,
            created_at: t.thought.created_at,
        })
        .collect();

    let swaps = thoughtswap_store::swaps::list_consented_swap_requests(&conn)
        .map_err(CoreError::from)?
        .into_iter()
        .map(|s| AdminSwapView {
            student_id: s.student_id,
            session_id: s.session_id,
            created_at: s.created_at,
        })
        .collect();

    let recent_logs = thoughtswap_store::logs::recent_log_events(&conn, ADMIN_LOG_WINDOW)
        .map_err(CoreError::from)?
        .into_iter()
        .map(|l| AdminLogView {
            event: l.event,
            user_id: l.user_id,
            payload: l.payload,
            created_at: l.created_at,
        })
        .collect();

    let total_thoughts = thoughts.len() as u64;
    let total_swaps = swaps.len() as u64;

    Ok(AdminDataPayload {
        stats: AdminStats {
            active_sessions: registry.active_session_count(),
            active_users: registry.total_participants(),
            total_users,
            total_consented,
            total_thoughts,
            total_swaps,
        },
        sessions,
        thoughts,
        swaps,
        recent_logs,
    })
}
