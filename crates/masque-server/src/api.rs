use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    middleware,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info};

use masque_relay::{BanOutcome, Relay};
use masque_shared::{AccountId, Pseudonym};
use masque_store::Account;

use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::rate_limit::{rate_limit_middleware, IpLimiter};
use crate::updates::{self, Update};

const SECRET_HEADER: &str = "x-telegram-bot-api-secret-token";

#[derive(Clone)]
pub struct AppState {
    pub relay: Arc<Relay>,
    pub config: Arc<ServerConfig>,
    pub rate_limiter: IpLimiter,
    pub started_at: Instant,
}

pub fn build_router(state: AppState) -> Router {
    let admin = Router::new()
        .route("/admin/stats", get(admin_stats))
        .route("/admin/accounts/{pseudonym}", get(admin_lookup))
        .route("/admin/ban", post(admin_ban))
        .route("/admin/unban", post(admin_unban))
        .route_layer(middleware::from_fn_with_state(
            state.rate_limiter.clone(),
            rate_limit_middleware,
        ));

    Router::new()
        .route("/health", get(health_check))
        .route("/info", get(server_info))
        .route("/webhook", post(webhook))
        .merge(admin)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

#[derive(Serialize)]
struct ServerInfoResponse {
    name: &'static str,
    version: &'static str,
    bot_username: String,
    state_version: u32,
    support_enabled: bool,
}

#[derive(Serialize)]
struct AdminStatsResponse {
    accounts: u64,
    banned: u64,
    delivered: u64,
    tracked_locks: usize,
    uptime_secs: u64,
}

#[derive(Deserialize)]
struct BanRequest {
    pseudonym: String,
    /// Moderator credited with the ban. Defaults to the first configured one.
    #[serde(default)]
    by: Option<i64>,
}

#[derive(Deserialize)]
struct UnbanRequest {
    pseudonym: String,
}

#[derive(Serialize)]
struct BanResponse {
    changed: bool,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn server_info(State(state): State<AppState>) -> Json<ServerInfoResponse> {
    let settings = state.relay.settings();
    Json(ServerInfoResponse {
        name: masque_shared::constants::APP_NAME,
        version: env!("CARGO_PKG_VERSION"),
        bot_username: settings.bot_username.clone(),
        state_version: settings.state_version,
        support_enabled: settings.support_account.is_some(),
    })
}

/// Bot API webhook. Always answers 200 once the caller is authenticated:
/// a non-2xx makes the platform redeliver, and redelivery would relay the
/// same message twice.
async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(update): Json<Update>,
) -> Result<StatusCode, ServerError> {
    verify_webhook_secret(&headers, &state.config)?;

    let update_id = update.update_id;
    let Some(envelope) = updates::to_envelope(update) else {
        debug!(update_id, "Ignoring update");
        return Ok(StatusCode::OK);
    };

    if let Err(e) = state.relay.handle(envelope).await {
        error!(update_id, error = %e, "Update processing failed");
    }
    Ok(StatusCode::OK)
}

fn verify_webhook_secret(headers: &HeaderMap, config: &ServerConfig) -> Result<(), ServerError> {
    let Some(ref expected) = config.webhook_secret else {
        return Ok(());
    };
    let given = headers
        .get(SECRET_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    if !constant_time_eq(given, expected) {
        return Err(ServerError::Forbidden("Invalid webhook secret".into()));
    }
    Ok(())
}

fn verify_admin_token(headers: &HeaderMap, config: &ServerConfig) -> Result<(), ServerError> {
    let Some(ref expected) = config.admin_token else {
        return Err(ServerError::Forbidden(
            "Admin API is disabled (no ADMIN_TOKEN configured)".into(),
        ));
    };

    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    let token = auth.strip_prefix("Bearer ").unwrap_or(auth);
    if !constant_time_eq(token, expected) {
        return Err(ServerError::Forbidden("Invalid admin token".into()));
    }

    Ok(())
}

fn constant_time_eq(given: &str, expected: &str) -> bool {
    let given = given.as_bytes();
    let expected = expected.as_bytes();
    given.len() == expected.len() && given.ct_eq(expected).unwrap_u8() == 1
}

fn parse_pseudonym(raw: &str) -> Result<Pseudonym, ServerError> {
    Pseudonym::parse(raw).ok_or_else(|| ServerError::BadRequest("malformed pseudonym".into()))
}

async fn admin_stats(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<AdminStatsResponse>, ServerError> {
    verify_admin_token(&headers, &state.config)?;

    let stats = state.relay.stats()?;
    Ok(Json(AdminStatsResponse {
        accounts: stats.accounts,
        banned: stats.banned,
        delivered: stats.delivered,
        tracked_locks: state.relay.locks().tracked().await,
        uptime_secs: state.started_at.elapsed().as_secs(),
    }))
}

async fn admin_lookup(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(pseudonym): Path<String>,
) -> Result<Json<Account>, ServerError> {
    verify_admin_token(&headers, &state.config)?;
    let pseudonym = parse_pseudonym(&pseudonym)?;
    Ok(Json(state.relay.lookup(&pseudonym)?))
}

async fn admin_ban(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<BanRequest>,
) -> Result<Json<BanResponse>, ServerError> {
    verify_admin_token(&headers, &state.config)?;
    let pseudonym = parse_pseudonym(&req.pseudonym)?;
    let by = req
        .by
        .map(AccountId)
        .or_else(|| state.relay.settings().moderators.first().copied())
        .unwrap_or(AccountId(0));

    let outcome = state.relay.ban(&pseudonym, by).await?;
    info!(pseudonym = %pseudonym, ?outcome, "Admin: ban");
    Ok(Json(BanResponse {
        changed: outcome == BanOutcome::Applied,
    }))
}

async fn admin_unban(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<UnbanRequest>,
) -> Result<Json<BanResponse>, ServerError> {
    verify_admin_token(&headers, &state.config)?;
    let pseudonym = parse_pseudonym(&req.pseudonym)?;

    let outcome = state.relay.unban(&pseudonym).await?;
    info!(pseudonym = %pseudonym, ?outcome, "Admin: unban");
    Ok(Json(BanResponse {
        changed: outcome == BanOutcome::Applied,
    }))
}

pub async fn serve(state: AppState, addr: std::net::SocketAddr) -> anyhow::Result<()> {
    let app = build_router(state);

    info!(addr = %addr, "Starting HTTP API server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .await?;

    Ok(())
}
