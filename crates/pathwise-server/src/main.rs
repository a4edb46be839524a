//! # pathwise-server
//!
//! HTTP front end for the Pathwise discovery engine.
//!
//! This binary provides:
//! - **REST API** (axum) for the social graph, activity feed,
//!   recommendations, trending and achievements
//! - **Scheduled jobs** that refresh the trending snapshot and purge expired
//!   recommendations
//! - **Throttling** per client IP, and per user on recommendation refresh

mod api;
mod config;
mod error;
mod mirror;
mod throttle;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Context;
use chrono::Utc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use pathwise_engine::{AchievementCatalog, DiscoveryEngine, SkillGraph};
use pathwise_shared::constants::APP_NAME;
use pathwise_store::Database;

use crate::api::AppState;
use crate::config::ServerConfig;
use crate::mirror::CatalogMirror;
use crate::throttle::Throttles;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Initialize tracing (respects RUST_LOG env var)
    // -----------------------------------------------------------------------
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,pathwise_server=debug")),
        )
        .init();

    info!("Starting {} discovery server v{}", APP_NAME, env!("CARGO_PKG_VERSION"));

    // -----------------------------------------------------------------------
    // 2. Load configuration
    // -----------------------------------------------------------------------
    let config = ServerConfig::from_env();
    info!(?config, "Loaded configuration");
    info!(
        instance = %config.instance_name,
        admin_enabled = config.admin_token.is_some(),
        "Instance settings"
    );

    // -----------------------------------------------------------------------
    // 3. Open the store and build the engine
    // -----------------------------------------------------------------------
    let db_path = match &config.database_path {
        Some(path) => path.clone(),
        None => Database::default_path()?,
    };
    let db = Database::open_at(&db_path, config.busy_timeout)
        .with_context(|| format!("opening database at {}", db_path.display()))?;
    let mirror = Arc::new(CatalogMirror::new(Database::open_at(
        &db_path,
        config.busy_timeout,
    )?));
    info!(path = %db_path.display(), "Database ready");

    let skills = match &config.skill_graph_path {
        Some(path) => SkillGraph::load(path)
            .with_context(|| format!("loading skill graph from {}", path.display()))?,
        None => SkillGraph::builtin(),
    };
    info!(skills = skills.len(), "Skill graph loaded");

    let achievements = match &config.achievements_path {
        Some(path) => AchievementCatalog::load(path)
            .with_context(|| format!("loading achievements from {}", path.display()))?,
        None => AchievementCatalog::builtin(),
    };
    info!(achievements = achievements.definitions().len(), "Achievement catalog loaded");

    let engine = DiscoveryEngine::new(mirror.clone(), mirror)
        .with_skill_graph(skills)
        .with_achievements(achievements);

    let throttles = Throttles::from_config(&config);
    let app_state = AppState {
        db: Arc::new(Mutex::new(db)),
        engine: Arc::new(engine),
        throttles: throttles.clone(),
        config: Arc::new(config.clone()),
    };

    // -----------------------------------------------------------------------
    // 4. Spawn background tasks
    // -----------------------------------------------------------------------

    // Trending refresh. The first tick fires immediately so a fresh instance
    // has a snapshot to serve.
    match config.trending_refresh_interval {
        Some(every) => {
            let state = app_state.clone();
            tokio::spawn(async move {
                let mut interval = tokio::time::interval(every);
                loop {
                    interval.tick().await;
                    let result = state
                        .with_db(|db, engine| engine.refresh_trending(db, Utc::now()))
                        .await;
                    match result {
                        Ok(ranked) => info!(ranked, "Scheduled trending refresh complete"),
                        Err(e) => warn!(error = %e, "Scheduled trending refresh failed, keeping previous snapshot"),
                    }
                }
            });
        }
        None => info!("Scheduled trending refresh disabled"),
    }

    // Expired recommendation purge
    let state = app_state.clone();
    let every = config.purge_interval;
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        loop {
            interval.tick().await;
            if let Err(e) = state
                .with_db(|db, engine| engine.purge_expired(db, Utc::now()))
                .await
            {
                warn!(error = %e, "Recommendation purge failed");
            }
        }
    });

    // Throttle cleanup (every 5 minutes, evict buckets idle >10 min)
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(300));
        loop {
            interval.tick().await;
            throttles.purge_stale(600.0).await;
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
