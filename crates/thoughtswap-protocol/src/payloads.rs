//! Typed payload bodies for the event protocol (§6). `thoughtswap-room`
//! constructs these directly rather than building ad hoc `serde_json::json!`
//! values, so a payload shape can only drift from this module, not per call
//! site.

use serde::{Deserialize, Serialize};
use thoughtswap_core::PromptKind;

// ---------------------------------------------------------------------------
// client -> server
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRoomPayload {
    pub join_code: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeacherSendPromptPayload {
    pub join_code: String,
    pub content: String,
    #[serde(rename = "type")]
    pub kind: PromptKind,
    #[serde(default)]
    pub options: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeacherDeleteThoughtPayload {
    pub join_code: String,
    pub thought_id: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeacherReassignDistributionPayload {
    pub join_code: String,
    pub student_connection_id: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinCodeOnlyPayload {
    pub join_code: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSessionSettingsPayload {
    pub join_code: String,
    pub max_swap_requests: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitThoughtPayload {
    pub join_code: String,
    pub content: String,
    pub prompt_use_id: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentRequestNewThoughtPayload {
    pub join_code: String,
    pub current_thought_content: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateConsentPayload {
    pub consent_given: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavePromptPayload {
    pub content: String,
    #[serde(rename = "type")]
    pub kind: PromptKind,
    #[serde(default)]
    pub options: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteSavedPromptPayload {
    pub id: String,
}

// ---------------------------------------------------------------------------
// server -> client
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantView {
    pub connection_id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantsUpdatePayload {
    pub participants: Vec<ParticipantView>,
    pub submission_count: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThoughtView {
    pub id: String,
    pub content: String,
    pub author_name: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThoughtsUpdatePayload {
    pub thoughts: Vec<ThoughtView>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DistributionEntryView {
    pub student_name: String,
    pub thought_content: String,
    pub original_author_name: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DistributionUpdatePayload {
    /// Keyed by connection id, matching the transport-level addressing the
    /// teacher view needs (§4.5 TRIGGER_SWAP).
    pub distribution: std::collections::HashMap<String, DistributionEntryView>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPromptPayload {
    pub content: String,
    pub prompt_use_id: String,
    #[serde(rename = "type")]
    pub kind: PromptKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiveSwapPayload {
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapCompletedPayload {
    pub count: usize,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum RestoreStatus {
    Submitted,
    Discussing,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoreStatePayload {
    pub status: RestoreStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_use_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(rename = "type")]
    pub kind: Option<PromptKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThoughtDeletedPayload {
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionEndedPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub survey_link: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassStartedPayload {
    pub join_code: String,
    pub session_id: String,
    pub max_swap_requests: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedPromptView {
    pub id: String,
    pub content: String,
    #[serde(rename = "type")]
    pub kind: PromptKind,
    pub options: Vec<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedPromptsListPayload {
    pub prompts: Vec<SavedPromptView>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviousSessionView {
    pub session_id: String,
    pub join_code: String,
    pub title: String,
    pub status: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviousSessionsPayload {
    pub sessions: Vec<PreviousSessionView>,
}

/// One row of the Admin Projection's thought feed (§4.8) — only consented
/// authors ever reach here; the store layer filters before this is built.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminThoughtView {
    pub id: String,
    pub content: String,
    pub author_name: String,
    pub prompt_use_id: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminSwapView {
    pub student_id: String,
    pub session_id: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminLogView {
    pub event: String,
    pub user_id: Option<String>,
    pub payload: serde_json::Value,
    pub created_at: String,
}

/// One ACTIVE Session row of the Admin Projection (§4.8), joined with its
/// course and a live count of PromptUses.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminSessionView {
    pub session_id: String,
    pub join_code: String,
    pub title: String,
    pub prompt_count: u64,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminStats {
    pub active_sessions: usize,
    pub active_users: usize,
    pub total_users: u64,
    pub total_consented: u64,
    pub total_thoughts: u64,
    pub total_swaps: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminDataPayload {
    pub stats: AdminStats,
    pub sessions: Vec<AdminSessionView>,
    pub thoughts: Vec<AdminThoughtView>,
    pub swaps: Vec<AdminSwapView>,
    pub recent_logs: Vec<AdminLogView>,
}
