use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::AppState;
use crate::domain::{ContestId, MatchId};
use crate::error::AppError;
use crate::orchestration::{EnqueueOutcome, FanOutSummary, TriggerSource};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerRequest {
    pub source: Option<TriggerSource>,
    pub match_event_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerResponse {
    pub contest_id: ContestId,
    pub outcome: EnqueueOutcome,
}

fn request_source(source: Option<TriggerSource>) -> Result<TriggerSource, AppError> {
    match source {
        None => Ok(TriggerSource::Manual),
        Some(TriggerSource::Backlog) => Err(AppError::BadRequest(
            "source must be one of: match_event, manual, scheduled".to_string(),
        )),
        Some(source) => Ok(source),
    }
}

/// Queue a recompute for one contest. Responds before the recompute runs.
pub async fn post_contest_trigger(
    Path(contest_id): Path<String>,
    State(state): State<AppState>,
    Json(body): Json<TriggerRequest>,
) -> Result<(StatusCode, Json<TriggerResponse>), AppError> {
    let source = request_source(body.source)?;
    let contest_id = ContestId::new(contest_id);
    state.service.contest_info(&contest_id).await?;

    let outcome =
        state
            .service
            .trigger_real_time_update(contest_id.clone(), source, body.match_event_id);
    if outcome == EnqueueOutcome::Closed {
        return Err(AppError::Unavailable(
            "dispatcher is not accepting triggers".to_string(),
        ));
    }

    Ok((
        StatusCode::ACCEPTED,
        Json(TriggerResponse {
            contest_id,
            outcome,
        }),
    ))
}

/// Fan a match-level trigger out to every contest scored from the match.
pub async fn post_match_recalculation(
    Path(match_id): Path<String>,
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<FanOutSummary>), AppError> {
    let summary = state
        .service
        .trigger_recalculation(&MatchId::new(match_id))
        .await?;
    Ok((StatusCode::ACCEPTED, Json(summary)))
}
