use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, Method, StatusCode},
    middleware,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use pathwise_engine::{
    AchievementDefinition, DiscoveryEngine, EvaluationOutcome, GenerationReport, Profile,
    RecommendationSection, StrategyFilter,
};
use pathwise_shared::{ActivityType, UserId, Visibility};
use pathwise_store::{ActivityEvent, Database, Metadata, TrendingEntry, UnlockedAchievement};

use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::throttle::{ip_throttle_middleware, Throttles};

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Mutex<Database>>,
    pub engine: Arc<DiscoveryEngine>,
    pub throttles: Throttles,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    /// Run `f` against the write connection on the blocking pool.
    pub async fn with_db<T, F>(&self, f: F) -> Result<T, ServerError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Database, &DiscoveryEngine) -> pathwise_engine::Result<T> + Send + 'static,
    {
        let db = Arc::clone(&self.db);
        let engine = Arc::clone(&self.engine);
        tokio::task::spawn_blocking(move || {
            let mut db = db
                .lock()
                .map_err(|_| ServerError::Internal("database connection poisoned".into()))?;
            f(&mut *db, &engine).map_err(ServerError::from)
        })
        .await
        .map_err(|e| ServerError::Internal(format!("blocking task failed: {e}")))?
    }
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route(
            "/users/:id/following/:target",
            post(follow_user).delete(unfollow_user),
        )
        .route("/users/:id/followers", get(list_followers))
        .route("/users/:id/following", get(list_following))
        .route("/users/:id/feed", get(user_feed))
        .route("/activity", post(record_activity))
        .route("/users/:id/recommendations", get(list_recommendations))
        .route(
            "/users/:id/recommendations/refresh",
            post(refresh_recommendations),
        )
        .route("/trending", get(list_trending))
        .route("/admin/trending/refresh", post(refresh_trending))
        .route("/achievements", get(list_achievements))
        .route("/achievements/:id", get(get_achievement))
        .route("/users/:id/achievements", get(list_unlocked))
        .route("/users/:id/achievements/evaluate", post(evaluate_achievements))
        .route("/users/:id/profile", get(user_profile))
        .layer(middleware::from_fn_with_state(
            state.throttles.per_ip.clone(),
            ip_throttle_middleware,
        ))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ─── Request / response bodies ───

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    instance: String,
}

#[derive(Serialize)]
struct FollowResponse {
    follower_id: UserId,
    following_id: UserId,
    created: bool,
}

#[derive(Serialize)]
struct UserListResponse {
    user_id: UserId,
    users: Vec<UserId>,
}

#[derive(Deserialize)]
struct FeedQuery {
    limit: Option<i64>,
}

#[derive(Deserialize)]
struct RecommendationQuery {
    strategy: Option<String>,
}

#[derive(Deserialize)]
struct TrendingQuery {
    limit: Option<u32>,
}

#[derive(Serialize)]
struct TrendingRefreshResponse {
    ranked: usize,
    calculated_at: DateTime<Utc>,
}

#[derive(Deserialize)]
struct RecordActivityRequest {
    actor_user_id: UserId,
    activity_type: ActivityType,
    reference_type: String,
    reference_id: String,
    #[serde(default)]
    metadata: Metadata,
    visibility: Visibility,
}

fn user_param(raw: &str) -> Result<UserId, ServerError> {
    UserId::parse(raw).map_err(|e| ServerError::BadRequest(format!("user id: {e}")))
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

    use subtle::ConstantTimeEq;
    let token_bytes = token.as_bytes();
    let expected_bytes = expected.as_bytes();
    if token_bytes.len() != expected_bytes.len()
        || token_bytes.ct_eq(expected_bytes).unwrap_u8() != 1
    {
        return Err(ServerError::Forbidden("Invalid admin token".into()));
    }

    Ok(())
}

// ─── Handlers ───

async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        instance: state.config.instance_name.clone(),
    })
}

async fn follow_user(
    State(state): State<AppState>,
    Path((id, target)): Path<(String, String)>,
) -> Result<(StatusCode, Json<FollowResponse>), ServerError> {
    let (follower, following) = (user_param(&id)?, user_param(&target)?);
    let created = state
        .with_db(move |db, engine| engine.follow(db, follower, following))
        .await?;

    let status = if created { StatusCode::CREATED } else { StatusCode::OK };
    Ok((
        status,
        Json(FollowResponse {
            follower_id: follower,
            following_id: following,
            created,
        }),
    ))
}

async fn unfollow_user(
    State(state): State<AppState>,
    Path((id, target)): Path<(String, String)>,
) -> Result<StatusCode, ServerError> {
    let (follower, following) = (user_param(&id)?, user_param(&target)?);
    state
        .with_db(move |db, engine| engine.unfollow(db, follower, following))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_followers(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<UserListResponse>, ServerError> {
    let user = user_param(&id)?;
    let users = state
        .with_db(move |db, engine| engine.followers(db, user))
        .await?;
    Ok(Json(UserListResponse { user_id: user, users }))
}

async fn list_following(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<UserListResponse>, ServerError> {
    let user = user_param(&id)?;
    let users = state
        .with_db(move |db, engine| engine.following(db, user))
        .await?;
    Ok(Json(UserListResponse { user_id: user, users }))
}

async fn user_feed(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<FeedQuery>,
) -> Result<Json<Vec<ActivityEvent>>, ServerError> {
    let user = user_param(&id)?;
    let events = state
        .with_db(move |db, engine| engine.feed(db, user, query.limit))
        .await?;
    Ok(Json(events))
}

async fn record_activity(
    headers: HeaderMap,
    State(state): State<AppState>,
    Json(req): Json<RecordActivityRequest>,
) -> Result<(StatusCode, Json<ActivityEvent>), ServerError> {
    verify_admin_token(&headers, &state.config)?;

    let mut event = ActivityEvent::new(
        req.actor_user_id,
        req.activity_type,
        req.reference_type,
        req.reference_id,
        req.visibility,
    );
    event.metadata = req.metadata;

    let recorded = event.clone();
    state
        .with_db(move |db, engine| engine.record_activity(db, &recorded))
        .await?;
    Ok((StatusCode::CREATED, Json(event)))
}

async fn list_recommendations(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<RecommendationQuery>,
) -> Result<Json<BTreeMap<&'static str, RecommendationSection>>, ServerError> {
    let user = user_param(&id)?;
    let filter: StrategyFilter = query
        .strategy
        .as_deref()
        .unwrap_or("all")
        .parse()
        .map_err(|e| ServerError::BadRequest(format!("{e}")))?;

    let live = state
        .with_db(move |db, engine| engine.recommendations(db, user, filter, Utc::now()))
        .await?;
    Ok(Json(DiscoveryEngine::group_by_section(live)))
}

async fn refresh_recommendations(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<GenerationReport>, ServerError> {
    let user = user_param(&id)?;
    state.throttles.check_refresh(user).await?;

    let report = state
        .with_db(move |db, engine| engine.generate_recommendations(db, user))
        .await?;
    Ok(Json(report))
}

async fn list_trending(
    State(state): State<AppState>,
    Query(query): Query<TrendingQuery>,
) -> Result<Json<Vec<TrendingEntry>>, ServerError> {
    let entries = state
        .with_db(move |db, engine| engine.trending(db, query.limit))
        .await?;
    Ok(Json(entries))
}

async fn refresh_trending(
    headers: HeaderMap,
    State(state): State<AppState>,
) -> Result<Json<TrendingRefreshResponse>, ServerError> {
    verify_admin_token(&headers, &state.config)?;

    let calculated_at = Utc::now();
    let ranked = state
        .with_db(move |db, engine| engine.refresh_trending(db, calculated_at))
        .await?;

    info!(ranked, "Admin refreshed trending");
    Ok(Json(TrendingRefreshResponse {
        ranked,
        calculated_at,
    }))
}

async fn list_achievements(State(state): State<AppState>) -> Json<Vec<AchievementDefinition>> {
    Json(state.engine.achievement_catalog().definitions().to_vec())
}

async fn get_achievement(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<AchievementDefinition>, ServerError> {
    Ok(Json(state.engine.achievement(&id)?.clone()))
}

async fn list_unlocked(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<UnlockedAchievement>>, ServerError> {
    let user = user_param(&id)?;
    let unlocked = state
        .with_db(move |db, engine| engine.unlocked_achievements(db, user))
        .await?;
    Ok(Json(unlocked))
}

async fn evaluate_achievements(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<EvaluationOutcome>, ServerError> {
    let user = user_param(&id)?;
    let outcome = state
        .with_db(move |db, engine| engine.evaluate_achievements(db, user))
        .await?;
    Ok(Json(outcome))
}

async fn user_profile(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Profile>, ServerError> {
    let user = user_param(&id)?;
    let profile = state
        .with_db(move |db, engine| engine.profile(db, user))
        .await?;
    Ok(Json(profile))
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
