use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::api::AppState;
use crate::domain::{ContestId, Leaderboard, LeaderboardEntry, UserId, UserRank};
use crate::error::AppError;
use crate::orchestration::LiveLeaderboard;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedLeaderboardQuery {
    pub max_age_secs: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserQuery {
    pub user_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedLeaderboardResponse {
    pub contest_id: ContestId,
    pub entries: Vec<LeaderboardEntry>,
    pub total_participants: u32,
    pub computed_at: DateTime<Utc>,
    pub cached_at: DateTime<Utc>,
    pub from_cache: bool,
    pub stale: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankResponse {
    pub contest_id: ContestId,
    #[serde(flatten)]
    pub rank: UserRank,
}

fn parse_max_age(raw: Option<&str>) -> Result<Option<Duration>, AppError> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<u64>().map(Duration::from_secs).map_err(|_| {
                AppError::BadRequest("maxAgeSecs must be a non-negative integer".to_string())
            })
        })
        .transpose()
}

fn require_user(raw: Option<&str>) -> Result<UserId, AppError> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(UserId::new)
        .ok_or_else(|| AppError::BadRequest("userId is required".to_string()))
}

/// Cached read; recomputes only when the entry is older than `maxAgeSecs` or dirty.
pub async fn get_leaderboard(
    Path(contest_id): Path<String>,
    Query(params): Query<CachedLeaderboardQuery>,
    State(state): State<AppState>,
) -> Result<Json<CachedLeaderboardResponse>, AppError> {
    let max_age = parse_max_age(params.max_age_secs.as_deref())?;
    let view = state
        .service
        .get_cached_leaderboard(&ContestId::new(contest_id), max_age)
        .await?;

    let board = view.leaderboard.as_ref();
    Ok(Json(CachedLeaderboardResponse {
        contest_id: board.contest_id.clone(),
        entries: board.entries.clone(),
        total_participants: board.total_participants,
        computed_at: board.computed_at,
        cached_at: view.cached_at,
        from_cache: view.from_cache,
        stale: view.stale,
    }))
}

pub async fn get_fresh_leaderboard(
    Path(contest_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<Leaderboard>, AppError> {
    let board = state
        .service
        .calculate_leaderboard(&ContestId::new(contest_id))
        .await?;
    Ok(Json(board))
}

pub async fn get_live_leaderboard(
    Path(contest_id): Path<String>,
    Query(params): Query<UserQuery>,
    State(state): State<AppState>,
) -> Result<Json<LiveLeaderboard>, AppError> {
    let user_id = require_user(params.user_id.as_deref())?;
    let live = state
        .service
        .get_live_leaderboard(&ContestId::new(contest_id), &user_id)
        .await?;
    Ok(Json(live))
}

pub async fn get_rank(
    Path(contest_id): Path<String>,
    Query(params): Query<UserQuery>,
    State(state): State<AppState>,
) -> Result<Json<RankResponse>, AppError> {
    let user_id = require_user(params.user_id.as_deref())?;
    let contest_id = ContestId::new(contest_id);
    let rank = state.service.rank_of(&contest_id, &user_id).await?;
    Ok(Json(RankResponse { contest_id, rank }))
}
