use axum::{
    extract::{Path, State},
    Json,
};

use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/v1/jobs/{id}",
    params(("id" = String, Path, description = "Job ID")),
    responses((status = 200, description = "Job status", body = jobs::JobStatus))
)]
pub async fn status(State(state): State<AppState>, Path(id): Path<String>) -> Json<serde_json::Value> {
    let st = state.jobs.get(&id);
    Json(match st {
        None => serde_json::json!({"status": "not_found"}),
        Some(s) => serde_json::to_value(s).unwrap(),
    })
}

#[utoipa::path(
    get,
    path = "/v1/jobs/{id}/result",
    params(("id" = String, Path, description = "Job ID")),
    responses((status = 200, description = "Solve outcome (if ready)", body = types::SolveOutcome))
)]
pub async fn result(State(state): State<AppState>, Path(id): Path<String>) -> Json<serde_json::Value> {
    let st = state.jobs.get(&id);
    Json(match st {
        Some(jobs::JobStatus::Solved { outcome, diagnostics }) => {
            serde_json::json!({"status": "solved", "outcome": outcome, "diagnostics": diagnostics})
        }
        Some(jobs::JobStatus::Failed { message, exit_code }) => {
            serde_json::json!({"status": "failed", "message": message, "exit_code": exit_code})
        }
        Some(jobs::JobStatus::Queued) => serde_json::json!({"status": "queued"}),
        Some(jobs::JobStatus::Running) => serde_json::json!({"status": "running"}),
        None => serde_json::json!({"status": "not_found"}),
    })
}
