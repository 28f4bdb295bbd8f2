//! Server configuration loaded from environment variables.
//!
//! Everything except the bot token has a default, so the server starts for
//! local development with no configuration at all.

use std::net::SocketAddr;
use std::path::PathBuf;

use masque_relay::RelaySettings;
use masque_shared::constants::{DEFAULT_HTTP_PORT, DEFAULT_STATE_VERSION};
use masque_shared::AccountId;

/// Server configuration.
#[derive(Clone)]
pub struct ServerConfig {
    /// Socket address for the HTTP (axum) API server.
    /// Env: `HTTP_ADDR`
    /// Default: `0.0.0.0:8080`
    pub http_addr: SocketAddr,

    /// SQLite file holding accounts, conversations and block lists.
    /// Env: `DATABASE_PATH`
    /// Default: `./data/masque.db`
    pub database_path: PathBuf,

    /// Bot API token. Without it every outbound call fails.
    /// Env: `BOT_TOKEN`
    pub bot_token: String,

    /// Env: `BOT_API_BASE`
    /// Default: `https://api.telegram.org`
    pub bot_api_base: String,

    /// Public bot handle, used in share links.
    /// Env: `BOT_USERNAME`
    pub bot_username: String,

    /// Bump to force every account through a session reset.
    /// Env: `STATE_VERSION`
    pub state_version: u32,

    /// Account the reserved `support` pseudonym routes to.
    /// Env: `SUPPORT_ACCOUNT_ID`
    pub support_account: Option<AccountId>,

    /// Comma-separated account ids notified of new users and bans.
    /// Env: `MODERATOR_IDS`
    pub moderators: Vec<AccountId>,

    /// Admin API bearer token. Required to access /admin/* endpoints.
    /// Env: `ADMIN_TOKEN`
    /// Default: empty (admin API disabled).
    pub admin_token: Option<String>,

    /// Expected `X-Telegram-Bot-Api-Secret-Token` on webhook calls.
    /// Env: `WEBHOOK_SECRET`
    /// Default: empty (header not checked).
    pub webhook_secret: Option<String>,

    /// Per-account command budget.
    /// Env: `FLOOD_RATE`, `FLOOD_BURST`
    pub flood_rate: f64,
    pub flood_burst: f64,
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("http_addr", &self.http_addr)
            .field("database_path", &self.database_path)
            .field("bot_api_base", &self.bot_api_base)
            .field("bot_username", &self.bot_username)
            .field("state_version", &self.state_version)
            .field("support_account", &self.support_account)
            .field("moderators", &self.moderators)
            .field("admin_enabled", &self.admin_token.is_some())
            .field("webhook_secret_set", &self.webhook_secret.is_some())
            .field("flood_rate", &self.flood_rate)
            .field("flood_burst", &self.flood_burst)
            .finish_non_exhaustive()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        let relay = RelaySettings::default();
        Self {
            http_addr: ([0, 0, 0, 0], DEFAULT_HTTP_PORT).into(),
            database_path: PathBuf::from("./data/masque.db"),
            bot_token: String::new(),
            bot_api_base: "https://api.telegram.org".to_string(),
            bot_username: relay.bot_username,
            state_version: DEFAULT_STATE_VERSION,
            support_account: None,
            moderators: Vec::new(),
            admin_token: None,
            webhook_secret: None,
            flood_rate: relay.flood_rate,
            flood_burst: relay.flood_burst,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(addr) = var("HTTP_ADDR") {
            if let Ok(parsed) = addr.parse::<SocketAddr>() {
                config.http_addr = parsed;
            } else {
                tracing::warn!(value = %addr, "Invalid HTTP_ADDR, using default");
            }
        }

        if let Some(path) = var("DATABASE_PATH") {
            config.database_path = PathBuf::from(path);
        }

        if let Some(token) = var("BOT_TOKEN") {
            config.bot_token = token.trim().to_string();
        }

        if let Some(base) = var("BOT_API_BASE") {
            config.bot_api_base = base.trim_end_matches('/').to_string();
        }

        if let Some(name) = var("BOT_USERNAME") {
            let name = name.trim().trim_start_matches('@');
            if !name.is_empty() {
                config.bot_username = name.to_string();
            }
        }

        if let Some(val) = var("STATE_VERSION") {
            match val.trim().parse::<u32>() {
                Ok(v) => config.state_version = v,
                Err(_) => tracing::warn!(value = %val, "Invalid STATE_VERSION, using default"),
            }
        }

        if let Some(val) = var("SUPPORT_ACCOUNT_ID") {
            match val.trim().parse::<i64>() {
                Ok(id) => config.support_account = Some(AccountId(id)),
                Err(_) => tracing::warn!(value = %val, "Invalid SUPPORT_ACCOUNT_ID, ignoring"),
            }
        }

        if let Some(val) = var("MODERATOR_IDS") {
            config.moderators = parse_account_list(&val);
        }

        if let Some(token) = var("ADMIN_TOKEN") {
            if !token.is_empty() {
                config.admin_token = Some(token);
            }
        }

        if let Some(secret) = var("WEBHOOK_SECRET") {
            if !secret.is_empty() {
                config.webhook_secret = Some(secret);
            }
        }

        if let Some(val) = var("FLOOD_RATE") {
            match val.parse::<f64>() {
                Ok(v) if v > 0.0 => config.flood_rate = v,
                _ => tracing::warn!(value = %val, "Invalid FLOOD_RATE, using default"),
            }
        }

        if let Some(val) = var("FLOOD_BURST") {
            match val.parse::<f64>() {
                Ok(v) if v >= 1.0 => config.flood_burst = v,
                _ => tracing::warn!(value = %val, "Invalid FLOOD_BURST, using default"),
            }
        }

        config
    }

    pub fn relay_settings(&self) -> RelaySettings {
        RelaySettings {
            state_version: self.state_version,
            support_account: self.support_account,
            moderators: self.moderators.clone(),
            bot_username: self.bot_username.clone(),
            flood_rate: self.flood_rate,
            flood_burst: self.flood_burst,
        }
    }
}

/// Parse `"1, 2,3"` into account ids, skipping (and logging) bad entries.
fn parse_account_list(raw: &str) -> Vec<AccountId> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| match s.parse::<i64>() {
            Ok(id) => Some(AccountId(id)),
            Err(_) => {
                tracing::warn!(value = %s, "Invalid entry in MODERATOR_IDS, skipping");
                None
            }
        })
        .collect()
}
