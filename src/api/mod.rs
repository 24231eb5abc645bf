use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::{AppConfig, ScoringTables};
use crate::db::{ScoreStore, SqliteStore};
use crate::models::{
    ApiResponse, LevelInfo, MatchScoreDetail, MatchScoreInput, RankContext, StoredProfile,
    UserScoringProfile,
};
use crate::services::{calculate_level, load_user_profile, record_match, update_ranking, ScoringEngine};

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<ScoringEngine>,
    pub store: Arc<dyn ScoreStore>,
}

impl AppState {
    pub fn new(engine: ScoringEngine, store: Arc<dyn ScoreStore>) -> Self {
        Self {
            engine: Arc::new(engine),
            store,
        }
    }
}

pub async fn serve(config: AppConfig) -> anyhow::Result<()> {
    let store = SqliteStore::connect(&config.database_url).await?;
    let state = AppState::new(ScoringEngine::new(config.tables), Arc::new(store));

    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port)).await?;
    tracing::info!("TacticIQ scoring API listening on port {}", config.port);

    axum::serve(listener, app).await?;
    Ok(())
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/scoring/tables", get(get_tables_handler))
        .route("/scores/calculate", post(calculate_score_handler))
        .route("/levels/{points}", get(get_level_handler))
        .route("/users/{id}/matches", post(record_match_handler))
        .route("/users/{id}/ranking", post(update_ranking_handler))
        .route("/users/{id}/profile", get(get_profile_handler))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

// Health check endpoint
async fn health_check() -> Json<ApiResponse<&'static str>> {
    Json(ApiResponse::success("TacticIQ scoring API is running"))
}

// GET /scoring/tables - Active point and multiplier tables
async fn get_tables_handler(State(state): State<AppState>) -> Json<ApiResponse<ScoringTables>> {
    Json(ApiResponse::success(state.engine.tables().clone()))
}

// POST /scores/calculate - Score one match without persisting anything
async fn calculate_score_handler(
    State(state): State<AppState>,
    Json(input): Json<MatchScoreInput>,
) -> Json<ApiResponse<MatchScoreDetail>> {
    Json(ApiResponse::success(state.engine.calculate_match_score(&input)))
}

// GET /levels/:points - Level for a points total
async fn get_level_handler(
    State(state): State<AppState>,
    Path(points): Path<f64>,
) -> Json<ApiResponse<LevelInfo>> {
    Json(ApiResponse::success(calculate_level(points, &state.engine.tables().levels)))
}

// POST /users/:id/matches - Score a match with the stored streak and record it
async fn record_match_handler(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(input): Json<MatchScoreInput>,
) -> Result<Json<ApiResponse<MatchScoreDetail>>, StatusCode> {
    match record_match(state.store.as_ref(), &state.engine, &user_id, &input).await {
        Ok(detail) => Ok(Json(ApiResponse::success(detail))),
        Err(e) => {
            tracing::error!("Failed to record match for {}: {}", user_id, e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

// POST /users/:id/ranking - Store leaderboard position from the ranking service
async fn update_ranking_handler(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(ranking): Json<RankContext>,
) -> Result<Json<ApiResponse<StoredProfile>>, StatusCode> {
    match update_ranking(state.store.as_ref(), &user_id, ranking).await {
        Ok(profile) => Ok(Json(ApiResponse::success(profile))),
        Err(e) => {
            tracing::error!("Failed to update ranking for {}: {}", user_id, e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

// GET /users/:id/profile - Scoring profile folded from history
async fn get_profile_handler(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<ApiResponse<UserScoringProfile>>, StatusCode> {
    match load_user_profile(state.store.as_ref(), &state.engine, &user_id).await {
        Ok(Some(profile)) => Ok(Json(ApiResponse::success(profile))),
        Ok(None) => Err(StatusCode::NOT_FOUND),
        Err(e) => {
            tracing::error!("Failed to load profile for {}: {}", user_id, e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::models::{AnalysisFocus, ScoreLine};
    use crate::services::scoring_engine::tests::score_only_input;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    fn app() -> Router {
        create_router(AppState::new(ScoringEngine::default(), Arc::new(MemoryStore::new())))
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn post_json(uri: &str, body: &impl serde::Serialize) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(body).unwrap()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = app()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["success"], true);
    }

    #[tokio::test]
    async fn test_calculate_score() {
        let input = score_only_input("m1", ScoreLine::new(2, 1), ScoreLine::new(2, 1), AnalysisFocus::Score);
        let response = app().oneshot(post_json("/scores/calculate", &input)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["data"]["totalScore"], 20.0);
        assert_eq!(body["data"]["scoreCorrect"]["tier"], "exact");
    }

    #[tokio::test]
    async fn test_level_lookup() {
        let response = app()
            .oneshot(Request::builder().uri("/levels/2600").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = json_body(response).await;
        assert_eq!(body["data"]["title"], "Legend");
    }

    #[tokio::test]
    async fn test_record_then_profile() {
        let app = app();

        let missing = app
            .clone()
            .oneshot(Request::builder().uri("/users/fan/profile").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);

        let input = score_only_input("m1", ScoreLine::new(1, 1), ScoreLine::new(0, 0), AnalysisFocus::Balanced);
        let recorded = app.clone().oneshot(post_json("/users/fan/matches", &input)).await.unwrap();
        assert_eq!(recorded.status(), StatusCode::OK);

        let response = app
            .oneshot(Request::builder().uri("/users/fan/profile").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        // Goal difference 6 × 1.2
        assert_eq!(body["data"]["totalPoints"], 7.2);
        assert_eq!(body["data"]["matchesPlayed"], 1);
        assert_eq!(body["data"]["currentStreak"], 1);
    }
}
