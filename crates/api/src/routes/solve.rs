use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use assign_core::RosterRecord;
use types::{Config, Student};

use crate::state::AppState;

/// Request body for `/v1/solve`: an unreconciled survey/roster pair plus run configuration
/// (§6's CSV shape, carried as JSON here instead).
#[derive(Deserialize, ToSchema)]
pub struct SolveRequest {
    pub survey: Vec<Student>,
    pub roster: Vec<RosterRecord>,
    #[serde(default)]
    pub config: Config,
}

#[derive(Serialize, ToSchema)]
pub struct JobCreated {
    pub job_id: String,
    pub status: &'static str,
}

#[utoipa::path(
    post,
    path = "/v1/solve",
    request_body = SolveRequest,
    responses((status = 200, description = "Job enqueued", body = JobCreated))
)]
pub async fn solve(State(state): State<AppState>, Json(req): Json<SolveRequest>) -> Json<JobCreated> {
    let id = state.jobs.enqueue(req.survey, req.roster, req.config);
    Json(JobCreated {
        job_id: id.0,
        status: "queued",
    })
}
