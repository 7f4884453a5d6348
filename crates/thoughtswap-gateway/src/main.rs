use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tracing::{info, warn};

mod app;
mod http;
mod ws;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "thoughtswap_gateway=info,tower_http=debug".into()),
        )
        .init();

    // load config: explicit path > THOUGHTSWAP_CONFIG env > ~/.thoughtswap/thoughtswap.toml
    let config_path = std::env::var("THOUGHTSWAP_CONFIG").ok();
    let config = thoughtswap_core::config::ThoughtSwapConfig::load(config_path.as_deref())
        .unwrap_or_else(|e| {
            warn!("config load failed ({}), using defaults", e);
            thoughtswap_core::config::ThoughtSwapConfig::default()
        });

    let db_path = config.database.path.clone();
    if let Some(parent) = std::path::Path::new(&db_path).parent() {
        std::fs::create_dir_all(parent)?;
    }
    let conn = rusqlite::Connection::open(&db_path)?;
    thoughtswap_store::init_db(&conn)?;
    let db = Arc::new(Mutex::new(conn));

    let (auto_end_tx, auto_end_rx) = mpsc::unbounded_channel();
    let registry = thoughtswap_room::RoomRegistry::new(
        db.clone(),
        config.session.teacher_disconnect_debounce_ms,
        auto_end_tx,
    );
    let identity = thoughtswap_identity::IdentityResolver::new(db.clone());

    let bind = config.gateway.bind.clone();
    let port = config.gateway.port;
    let state = Arc::new(app::AppState::new(config, db, identity, registry));

    tokio::spawn(app::drive_auto_end(state.clone(), auto_end_rx));

    let router = app::build_router(state.clone());
    let addr: SocketAddr = format!("{}:{}", bind, port).parse()?;
    info!("ThoughtSwap gateway listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}
