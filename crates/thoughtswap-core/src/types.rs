use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a persisted User (UUIDv7 — time-sortable for log correlation).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

impl UserId {
    pub fn new() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for UserId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Per-connection identifier. Random, not persisted, changes on every reconnect —
/// this is exactly the identifier the Distribution must not rely on alone (§9).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnId(pub String);

impl ConnId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ConnId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Six-character uppercase alphanumeric room identifier (§4.4, §6).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JoinCode(pub String);

const JOIN_CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
pub const JOIN_CODE_LEN: usize = 6;

impl JoinCode {
    /// Draw a uniformly random 6-char code from `[A-Z0-9]`.
    pub fn random() -> Self {
        use rand::Rng;
        let mut rng = rand::thread_rng();
        let code: String = (0..JOIN_CODE_LEN)
            .map(|_| JOIN_CODE_ALPHABET[rng.gen_range(0..JOIN_CODE_ALPHABET.len())] as char)
            .collect();
        Self(code)
    }

    /// Case-normalize a client-supplied code (§6: "case-normalized on input").
    pub fn normalize(raw: &str) -> Self {
        Self(raw.trim().to_ascii_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JoinCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Authoritative role, resolved from the stored User — never from the handshake
/// claim (§3 global invariants, §4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum UserRole {
    Student,
    Teacher,
    Admin,
}

impl UserRole {
    pub fn is_teacher(&self) -> bool {
        matches!(self, UserRole::Teacher)
    }

    pub fn is_student(&self) -> bool {
        matches!(self, UserRole::Student)
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, UserRole::Admin)
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserRole::Student => write!(f, "STUDENT"),
            UserRole::Teacher => write!(f, "TEACHER"),
            UserRole::Admin => write!(f, "ADMIN"),
        }
    }
}

impl std::str::FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "STUDENT" => Ok(UserRole::Student),
            "TEACHER" => Ok(UserRole::Teacher),
            "ADMIN" => Ok(UserRole::Admin),
            other => Err(format!("unknown role: {}", other)),
        }
    }
}

/// Prompt content type (§3 SavedPrompt/PromptUse).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PromptKind {
    Text,
    Mc,
    Scale,
}

impl fmt::Display for PromptKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PromptKind::Text => write!(f, "TEXT"),
            PromptKind::Mc => write!(f, "MC"),
            PromptKind::Scale => write!(f, "SCALE"),
        }
    }
}

impl std::str::FromStr for PromptKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "TEXT" => Ok(PromptKind::Text),
            "MC" => Ok(PromptKind::Mc),
            "SCALE" => Ok(PromptKind::Scale),
            other => Err(format!("unknown prompt type: {}", other)),
        }
    }
}

/// Minimum/maximum option count for an MC prompt (§4.5 TEACHER_SEND_PROMPT validation).
pub const MC_OPTIONS_MIN: usize = 2;
pub const MC_OPTIONS_MAX: usize = 6;

/// Room session state machine (§4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RoomState {
    Idle,
    AwaitingSubmissions,
    Swapped,
}

impl fmt::Display for RoomState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoomState::Idle => write!(f, "IDLE"),
            RoomState::AwaitingSubmissions => write!(f, "AWAITING_SUBMISSIONS"),
            RoomState::Swapped => write!(f, "SWAPPED"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_code_is_six_uppercase_alnum() {
        let code = JoinCode::random();
        assert_eq!(code.as_str().len(), JOIN_CODE_LEN);
        assert!(code.as_str().chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
    }

    #[test]
    fn join_code_normalizes_case_and_whitespace() {
        let code = JoinCode::normalize(" abc123 \n");
        assert_eq!(code.as_str(), "ABC123");
    }

    #[test]
    fn role_roundtrips_through_display_and_parse() {
        use std::str::FromStr;
        for role in [UserRole::Student, UserRole::Teacher, UserRole::Admin] {
            let parsed = UserRole::from_str(&role.to_string()).unwrap();
            assert_eq!(parsed, role);
        }
    }
}
