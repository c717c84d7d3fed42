//! Doorman Session Authority service
//!
//! Hosts the session authority behind a small HTTP surface. Clients
//! receive a signed bearer artifact on login and present it in an
//! `Authorization: Bearer` header on every authenticated request.

use std::sync::Arc;

use anyhow::Result;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use doorman_authority::{
    load_or_generate_signing_key, routes, AppState, Config, InMemoryAccountStore,
    InMemorySessionStore, SessionAuthority, SessionPolicy, SqliteStore,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "doorman_authority=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env();
    tracing::info!(?config, "Loaded configuration");

    // Load or generate the artifact-signing key
    let signing_key = load_or_generate_signing_key(&config.key_file)?;
    tracing::info!(
        public_key = %signing_key.public_key().to_base64(),
        "Loaded signing key"
    );

    let policy = SessionPolicy {
        session_ttl: chrono::Duration::hours(config.session_ttl_hours),
        max_concurrent_sessions: config.max_concurrent_sessions,
    };

    // Create app state and router over the configured store backend
    let app = match &config.database {
        Some(path) => {
            let store = Arc::new(SqliteStore::open(path)?);
            let state = Arc::new(AppState::new(SessionAuthority::new(
                store.clone(),
                store,
                signing_key,
                policy,
            )));
            routes::create_router(state)
        }
        None => {
            tracing::warn!("No database configured; sessions will not survive a restart");
            let state = Arc::new(AppState::new(SessionAuthority::new(
                InMemoryAccountStore::new(),
                InMemorySessionStore::new(),
                signing_key,
                policy,
            )));
            routes::create_router(state)
        }
    };

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Session authority listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
