use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

pub const PROTOCOL_VERSION: u32 = 1;
pub const DEFAULT_PORT: u16 = 4000;
pub const DEFAULT_BIND: &str = "0.0.0.0";
pub const MAX_PAYLOAD_BYTES: usize = 64 * 1024; // 64 KB hard cap per frame
pub const HEARTBEAT_INTERVAL_SECS: u64 = 30;

/// Default per-student re-swap quota for a freshly created Session (§4.9).
pub const DEFAULT_MAX_SWAP_REQUESTS: u32 = 1;

/// Bounded retry count for join-code generation on store collision (§4.4).
pub const JOIN_CODE_MAX_RETRIES: u32 = 10;

/// Retry budget for the Swap Engine's derangement shuffle (§4.6).
pub const DERANGEMENT_MAX_SHUFFLES: u32 = 5;

/// Most recent LogEvents surfaced by the Admin Projection (§4.8).
pub const ADMIN_LOG_WINDOW: usize = 500;

/// Top-level config (thoughtswap.toml + THOUGHTSWAP_* env overrides).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThoughtSwapConfig {
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub oauth: OAuthConfig,
}

impl Default for ThoughtSwapConfig {
    fn default() -> Self {
        Self {
            gateway: GatewayConfig {
                port: DEFAULT_PORT,
                bind: DEFAULT_BIND.to_string(),
            },
            database: DatabaseConfig::default(),
            session: SessionConfig::default(),
            oauth: OAuthConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_bind")]
    pub bind: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Knobs for session-lifecycle behaviour that the spec leaves
/// implementation-defined (§5, §9).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Window after a teacher disconnect during which a reconnect cancels
    /// auto-end, instead of completing the Session immediately (§4.9, §9).
    /// Spec suggests 0-5s; default splits the difference.
    #[serde(default = "default_debounce_ms")]
    pub teacher_disconnect_debounce_ms: u64,
    /// Default `maxSwapRequests` for a newly created Session (§4.9).
    #[serde(default = "default_max_swap_requests")]
    pub default_max_swap_requests: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            teacher_disconnect_debounce_ms: default_debounce_ms(),
            default_max_swap_requests: default_max_swap_requests(),
        }
    }
}

/// Config for the (out-of-scope) OAuth handshake with the external LMS.
/// The core only needs enough to drive the thin callback shim described
/// in §6; the real token exchange is the collaborator's responsibility.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct OAuthConfig {
    /// Where the callback shim redirects to after resolving identity.
    pub ui_redirect_base: Option<String>,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}
fn default_db_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.thoughtswap/thoughtswap.db", home)
}
fn default_debounce_ms() -> u64 {
    2_000
}
fn default_max_swap_requests() -> u32 {
    DEFAULT_MAX_SWAP_REQUESTS
}

impl ThoughtSwapConfig {
    /// Load config from a TOML file with THOUGHTSWAP_* env var overrides.
    ///
    /// Checks in order:
    ///   1. Explicit path argument
    ///   2. ~/.thoughtswap/thoughtswap.toml
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);

        let config: ThoughtSwapConfig = Figment::new()
            .merge(Toml::file(&path))
            .merge(Env::prefixed("THOUGHTSWAP_").split("_"))
            .extract()
            .map_err(|e| crate::error::CoreError::Transient(format!("config: {e}")))?;

        Ok(config)
    }
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.thoughtswap/thoughtswap.toml", home)
}
