//! Server configuration loaded from environment variables.
//!
//! Every setting has a default so the server starts with zero configuration
//! for local development.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use pathwise_shared::constants::{DEFAULT_BUSY_TIMEOUT_MS, DEFAULT_HTTP_PORT};

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Socket address for the HTTP API.
    /// Env: `HTTP_ADDR`
    /// Default: `0.0.0.0:8080`
    pub http_addr: SocketAddr,

    /// SQLite database file.
    /// Env: `DATABASE_PATH`
    /// Default: the platform data directory (see `Database::default_path`).
    pub database_path: Option<PathBuf>,

    /// Bearer token for `/activity` and `/admin/*`.
    /// Env: `ADMIN_TOKEN`
    /// Default: unset (admin routes refuse every request).
    pub admin_token: Option<String>,

    /// Env: `INSTANCE_NAME`
    pub instance_name: String,

    /// Env: `TRENDING_REFRESH_SECS`, default 900.  `0` turns the scheduled
    /// refresh off (`None`); the admin route still works.
    pub trending_refresh_interval: Option<Duration>,

    /// Env: `RECOMMENDATION_PURGE_SECS`, default 3600.
    pub purge_interval: Duration,

    /// Env: `STORE_BUSY_TIMEOUT_MS`, default 5000.
    pub busy_timeout: Duration,

    /// JSON skill graph replacing the built-in curriculum.
    /// Env: `SKILL_GRAPH_PATH`
    pub skill_graph_path: Option<PathBuf>,

    /// JSON achievement catalog replacing the built-in definitions.
    /// Env: `ACHIEVEMENTS_PATH`
    pub achievements_path: Option<PathBuf>,

    /// Sustained API requests per second per client IP, and burst size.
    pub ip_rate: f64,
    pub ip_burst: f64,

    /// Recommendation refreshes per user: one token every `1 / user_refresh_rate`
    /// seconds, up to `user_refresh_burst`.
    pub user_refresh_rate: f64,
    pub user_refresh_burst: f64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: ([0, 0, 0, 0], DEFAULT_HTTP_PORT).into(),
            database_path: None,
            admin_token: None,
            instance_name: "Pathwise Discovery".to_string(),
            trending_refresh_interval: Some(Duration::from_secs(900)),
            purge_interval: Duration::from_secs(3600),
            busy_timeout: Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS),
            skill_graph_path: None,
            achievements_path: None,
            ip_rate: 10.0,
            ip_burst: 30.0,
            user_refresh_rate: 1.0 / 60.0,
            user_refresh_burst: 3.0,
        }
    }
}

impl ServerConfig {
    /// Load configuration from the process environment, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(addr) = var("HTTP_ADDR") {
            match addr.parse::<SocketAddr>() {
                Ok(parsed) => config.http_addr = parsed,
                Err(_) => tracing::warn!(value = %addr, "Invalid HTTP_ADDR, using default"),
            }
        }

        if let Some(path) = var("DATABASE_PATH").filter(|p| !p.is_empty()) {
            config.database_path = Some(PathBuf::from(path));
        }

        if let Some(token) = var("ADMIN_TOKEN").filter(|t| !t.is_empty()) {
            config.admin_token = Some(token);
        }

        if let Some(name) = var("INSTANCE_NAME") {
            config.instance_name = name;
        }

        if let Some(raw) = var("TRENDING_REFRESH_SECS") {
            match raw.trim().parse::<u64>() {
                Ok(0) => config.trending_refresh_interval = None,
                Ok(secs) => config.trending_refresh_interval = Some(Duration::from_secs(secs)),
                Err(_) => {
                    tracing::warn!(value = %raw, "Invalid TRENDING_REFRESH_SECS, using default")
                }
            }
        }

        if let Some(secs) = seconds(&var, "RECOMMENDATION_PURGE_SECS") {
            config.purge_interval = Duration::from_secs(secs);
        }

        if let Some(ms) = seconds(&var, "STORE_BUSY_TIMEOUT_MS") {
            config.busy_timeout = Duration::from_millis(ms);
        }

        if let Some(path) = var("SKILL_GRAPH_PATH").filter(|p| !p.is_empty()) {
            config.skill_graph_path = Some(PathBuf::from(path));
        }

        if let Some(path) = var("ACHIEVEMENTS_PATH").filter(|p| !p.is_empty()) {
            config.achievements_path = Some(PathBuf::from(path));
        }

        // RUST_LOG is read by tracing-subscriber's EnvFilter directly.

        config
    }
}

/// A positive integer setting; zero or garbage keeps the default.
fn seconds(var: &impl Fn(&str) -> Option<String>, key: &str) -> Option<u64> {
    let raw = var(key)?;
    match raw.trim().parse::<u64>() {
        Ok(n) if n > 0 => Some(n),
        _ => {
            tracing::warn!(key, value = %raw, "Invalid interval, using default");
            None
        }
    }
}
