use serde::{Deserialize, Serialize};

/// Identity hints carried by the client on connect (§4.1(a), §4.3).
///
/// These are *hints*: the resolved User's stored role always wins over
/// `role` for policy decisions (§3 global invariants). `email` additionally
/// doubles as the guest-detection signal (`guest_` prefix, §4.3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityHint {
    pub email: String,
    pub name: String,
    pub role: thoughtswap_core::UserRole,
}

pub const GUEST_EMAIL_PREFIX: &str = "guest_";

impl IdentityHint {
    pub fn is_guest(&self) -> bool {
        self.email.starts_with(GUEST_EMAIL_PREFIX)
    }
}

/// Server → Client: consent state, sent right after identity resolution and
/// again after every `UPDATE_CONSENT` (§4.3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsentStatus {
    pub consent_given: bool,
    pub consent_date: Option<String>,
}
