//! # masque-server
//!
//! Webhook server for the masque anonymous relay.
//!
//! This binary provides:
//! - **Bot API webhook** decoding updates into relay commands
//! - **HTTP transport** delivering relayed messages through the Bot API
//! - **Admin API** (axum) for ban, unban, pseudonym lookup and stats
//! - **Per-IP rate limiting** on the admin endpoints

mod api;
mod config;
mod error;
mod keyboard;
mod rate_limit;
mod telegram;
mod updates;

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use masque_relay::{Relay, Throttle};
use masque_store::Database;

use crate::api::AppState;
use crate::config::ServerConfig;
use crate::telegram::HttpTransport;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Initialize tracing (respects RUST_LOG env var)
    // -----------------------------------------------------------------------
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,masque_server=debug,masque_relay=debug")),
        )
        .init();

    info!("Starting masque relay server v{}", env!("CARGO_PKG_VERSION"));

    // -----------------------------------------------------------------------
    // 2. Load configuration
    // -----------------------------------------------------------------------
    let config = ServerConfig::from_env();
    info!(?config, "Loaded configuration");
    if config.bot_token.is_empty() {
        warn!("BOT_TOKEN is not set; every outbound message will fail");
    }
    if config.support_account.is_none() {
        warn!("SUPPORT_ACCOUNT_ID is not set; the support shortcut resolves to nobody");
    }

    // -----------------------------------------------------------------------
    // 3. Initialize subsystems
    // -----------------------------------------------------------------------
    let db = Arc::new(Database::open_at(&config.database_path)?);
    let transport = Arc::new(HttpTransport::new(&config.bot_api_base, &config.bot_token)?);
    let relay = Arc::new(Relay::new(db, transport, config.relay_settings()));

    // Admin API: 10 req/s sustained, burst of 30
    let rate_limiter = Throttle::default();

    let app_state = AppState {
        relay: relay.clone(),
        config: Arc::new(config.clone()),
        rate_limiter: rate_limiter.clone(),
        started_at: Instant::now(),
    };

    // -----------------------------------------------------------------------
    // 4. Spawn background tasks
    // -----------------------------------------------------------------------

    // Every 5 minutes, evict buckets idle >10 min
    let rl = rate_limiter.clone();
    let flood = relay.throttle().clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(300));
        loop {
            interval.tick().await;
            rl.purge_stale(600.0).await;
            flood.purge_stale(600.0).await;
        }
    });

    // Drop per-account locks nobody is holding or waiting on
    let locks = relay.locks().clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(600));
        loop {
            interval.tick().await;
            locks.purge_idle().await;
        }
    });

    // -----------------------------------------------------------------------
    // 5. Run the HTTP API server (blocks until shutdown)
    // -----------------------------------------------------------------------
    tokio::select! {
        result = api::serve(app_state, config.http_addr) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "HTTP server failed");
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
