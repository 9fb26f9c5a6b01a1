pub mod health;
pub mod leaderboard;
pub mod triggers;

use crate::config::Config;
use crate::orchestration::LeaderboardService;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<LeaderboardService>,
    pub config: Config,
}

impl AppState {
    pub fn new(service: Arc<LeaderboardService>, config: Config) -> Self {
        Self { service, config }
    }
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .route(
            "/v1/contests/:contest_id/leaderboard",
            get(leaderboard::get_leaderboard),
        )
        .route(
            "/v1/contests/:contest_id/leaderboard/fresh",
            get(leaderboard::get_fresh_leaderboard),
        )
        .route(
            "/v1/contests/:contest_id/leaderboard/live",
            get(leaderboard::get_live_leaderboard),
        )
        .route("/v1/contests/:contest_id/rank", get(leaderboard::get_rank))
        .route(
            "/v1/contests/:contest_id/triggers",
            post(triggers::post_contest_trigger),
        )
        .route(
            "/v1/matches/:match_id/recalculate",
            post(triggers::post_match_recalculation),
        )
        .layer(cors)
        .with_state(state)
}
