//! OAuth callback shim — GET /auth/callback.
//!
//! The actual token exchange with the external LMS is a collaborator's
//! responsibility (§1, §6): by the time a request reaches here, `code` has
//! already been resolved to `{name, role, email}` by that collaborator and
//! appended as query parameters. This handler's only job is redirecting the
//! browser back to the UI with those resolved fields (or an `error`) opaquely
//! carried along — no session state is created here.

use axum::{
    extract::{Query, State},
    response::Redirect,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::warn;

use crate::app::AppState;

#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    pub name: Option<String>,
    pub role: Option<String>,
    pub email: Option<String>,
    pub error: Option<String>,
    #[allow(dead_code)]
    pub state: Option<String>,
}

/// GET /auth/callback?name=...&role=...&email=...  (or `?error=...`).
pub async fn callback_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CallbackParams>,
) -> Redirect {
    let base = state
        .config
        .oauth
        .ui_redirect_base
        .clone()
        .unwrap_or_else(|| "/".to_string());

    if let Some(error) = params.error {
        warn!(%error, "oauth callback carried an error");
        return Redirect::to(&format!("{base}?error={}", urlencode(&error)));
    }

    let (Some(name), Some(role), Some(email)) = (params.name, params.role, params.email) else {
        return Redirect::to(&format!("{base}?error=incomplete_callback"));
    };

    Redirect::to(&format!(
        "{base}?name={}&role={}&email={}",
        urlencode(&name),
        urlencode(&role),
        urlencode(&email),
    ))
}

fn urlencode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(b as char)
            }
            _ => out.push_str(&format!("%{:02X}", b)),
        }
    }
    out
}
