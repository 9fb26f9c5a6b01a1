use crate::api::AppState;
use crate::orchestration::{DispatcherState, DispatcherStats};
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatcherReport {
    pub state: DispatcherState,
    pub queue_capacity: usize,
    pub backlog: usize,
    #[serde(flatten)]
    pub stats: DispatcherStats,
}

#[derive(Debug, Serialize)]
pub struct ReadyResponse {
    pub status: &'static str,
    pub dispatcher: DispatcherReport,
}

/// Ready while the dispatch worker is accepting triggers.
pub async fn ready(State(state): State<AppState>) -> (StatusCode, Json<ReadyResponse>) {
    let handle = state.service.dispatcher();
    let report = DispatcherReport {
        state: handle.state(),
        queue_capacity: handle.capacity(),
        backlog: handle.backlog().len(),
        stats: handle.stats(),
    };

    if handle.is_running() {
        (
            StatusCode::OK,
            Json(ReadyResponse {
                status: "ready",
                dispatcher: report,
            }),
        )
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ReadyResponse {
                status: "dispatcher_stopped",
                dispatcher: report,
            }),
        )
    }
}
