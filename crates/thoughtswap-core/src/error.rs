use thiserror::Error;

/// The error taxonomy from §7. Every fallible core operation returns one of
/// these variants; the gateway maps them to the wire behaviour the taxonomy
/// prescribes (`code()` / `client_message()` below) instead of re-deriving it
/// ad hoc at each call site.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Handshake identity unresolvable or role missing. Terminates the connection.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Command not permitted for the resolved role. Never surfaced to the
    /// client — existence of the command must not leak (§7 AUTHZ).
    #[error("not authorized: {0}")]
    Authz(String),

    /// Join code invalid, or the targeted session/room no longer exists.
    #[error("{0}")]
    NotFound(String),

    /// Session has moved to COMPLETED; the room no longer accepts commands.
    #[error("this class session has ended")]
    Gone,

    /// A precondition the caller could have checked failed (empty thought
    /// pool, quota exceeded, bad MC options, stale promptUseId, ...).
    #[error("{0}")]
    Precondition(String),

    /// Store or transport failure. Never surfaces detail to the client.
    #[error("transient failure: {0}")]
    Transient(String),

    /// Code-detected impossible state (e.g. SWAPPED with no PromptUse).
    /// Callers log this and attempt safe degradation; it is not sent to
    /// clients as-is.
    #[error("invariant violation: {0}")]
    Invariant(String),
}

impl CoreError {
    /// Short error code, mirrored on the wire where the transport needs one
    /// (the `ERROR` event itself carries only a message per §6/§7, but admin
    /// tooling and logs benefit from a stable code).
    pub fn code(&self) -> &'static str {
        match self {
            CoreError::Auth(_) => "AUTH_ERROR",
            CoreError::Authz(_) => "AUTHZ",
            CoreError::NotFound(_) => "NOT_FOUND",
            CoreError::Gone => "GONE",
            CoreError::Precondition(_) => "PRECONDITION",
            CoreError::Transient(_) => "TRANSIENT",
            CoreError::Invariant(_) => "INVARIANT",
        }
    }

    /// The human-readable message to put on an `ERROR {message}` event, or
    /// `None` when the taxonomy says the error must stay silent (AUTHZ).
    pub fn client_message(&self) -> Option<String> {
        match self {
            CoreError::Auth(_) => None, // AUTH_ERROR is its own event, not ERROR
            CoreError::Authz(_) => None,
            CoreError::NotFound(msg) => Some(msg.clone()),
            CoreError::Gone => Some("This class session has ended.".to_string()),
            CoreError::Precondition(msg) => Some(msg.clone()),
            CoreError::Transient(_) => Some("internal error".to_string()),
            CoreError::Invariant(_) => Some("internal error".to_string()),
        }
    }

    /// Only AUTH errors terminate the connection (§7 propagation policy).
    pub fn is_fatal(&self) -> bool {
        matches!(self, CoreError::Auth(_))
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
