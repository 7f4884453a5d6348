use serde::{Deserialize, Serialize};
use thoughtswap_core::{PromptKind, UserRole};

/// Persistent user record (§3 User). Created on first successful
/// authentication or guest login; mutated on re-auth and on consent update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// UUIDv7 — time-sortable, useful for log correlation.
    pub id: String,
    /// Unique; `None` only for guests, who get a synthesized id instead (§4.3).
    pub external_id: Option<String>,
    pub email: String,
    pub name: String,
    pub role: UserRole,
    pub consent_given: bool,
    pub consent_date: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub last_seen_at: String,
}

/// A teacher-owned reusable prompt template (§3 SavedPrompt).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedPrompt {
    pub id: String,
    pub teacher_id: String,
    pub content: String,
    pub kind: PromptKind,
    /// Non-empty iff `kind == Mc`, length 2-6.
    pub options: Vec<String>,
    pub created_at: String,
}

/// The container for the lifetime of one classroom instance (§3 Course).
/// Created on session start; never reused.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Course {
    pub id: String,
    pub teacher_id: String,
    pub title: String,
    pub join_code: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SessionStatus {
    Active,
    Completed,
}

/// §3 Session. At most one `Active` Session per Course.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub course_id: String,
    pub status: SessionStatus,
    pub max_swap_requests: u32,
    pub created_at: String,
    pub ended_at: Option<String>,
}

/// The act of issuing a prompt inside a Session (§3 PromptUse). Immutable
/// once created; a Session's "active" prompt is the latest by `created_at`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptUse {
    pub id: String,
    pub session_id: String,
    pub content: String,
    pub kind: PromptKind,
    pub options: Vec<String>,
    pub created_at: String,
}

/// A student's response to the current PromptUse (§3 Thought).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thought {
    pub id: String,
    pub prompt_use_id: String,
    pub author_id: String,
    pub content: String,
    pub created_at: String,
    pub deleted_at: Option<String>,
}

/// A Thought joined with its author's display name, the shape the Room and
/// Admin Projection actually consume (§4.2 `listThoughts`, §4.8).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThoughtWithAuthor {
    pub thought: Thought,
    pub author_name: String,
    pub author_consent_given: bool,
}

/// One row per student-initiated re-swap (§3 SwapRequest). Counted against
/// `Session.max_swap_requests`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwapRequest {
    pub id: String,
    pub student_id: String,
    pub session_id: String,
    pub created_at: String,
}

/// Append-only audit row (§3 LogEvent, §4.7).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEvent {
    pub id: String,
    pub event: String,
    pub user_id: Option<String>,
    /// Opaque JSON, caller-supplied.
    pub payload: serde_json::Value,
    pub created_at: String,
}
