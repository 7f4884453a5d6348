use thiserror::Error;
use thoughtswap_core::CoreError;

/// All store-layer errors. Kept separate from `CoreError` so call sites here
/// stay exact (e.g. a real `Conflict` on duplicate join code) while the Room
/// layer still only has to handle the §7 taxonomy once it converts.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),

    /// Duplicate `joinCode` on course creation (§4.4) — caller retries with a
    /// freshly generated code.
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Per §4.2/§7: store failures surface to the client as `TRANSIENT` for
/// everything except a missing row, which the caller already expects to
/// interpret as `NotFound`/`Gone` — so only non-`NotFound` cases are folded
/// here; callers match `StoreError::NotFound` themselves first.
impl From<StoreError> for CoreError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(msg) => CoreError::NotFound(msg),
            StoreError::Conflict(msg) => CoreError::Precondition(msg),
            StoreError::Database(err) => CoreError::Transient(err.to_string()),
            StoreError::Serde(err) => CoreError::Transient(err.to_string()),
        }
    }
}
