use axum::Json;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use assign_core::scoring;
use types::{Group, ObjectiveBreakdown, SoftConflictWeights, Student};

/// Request body for `/v1/explain`: a finished assignment plus the weights it was scored
/// under, so a caller can see the per-component breakdown behind `ObjectiveBreakdown` (§6.6).
#[derive(Deserialize, ToSchema)]
pub struct ExplainRequest {
    pub participants: Vec<Student>,
    pub groups: Vec<Group>,
    pub weights: SoftConflictWeights,
}

#[derive(Serialize, ToSchema)]
pub struct ExplainOut {
    pub objective: ObjectiveBreakdown,
}

#[utoipa::path(
    post,
    path = "/v1/explain",
    request_body = ExplainRequest,
    responses((status = 200, description = "Objective breakdown for the provided assignment", body = ExplainOut))
)]
pub async fn explain(Json(req): Json<ExplainRequest>) -> Json<ExplainOut> {
    let objective = scoring::compute_objective(&req.groups, &req.participants, &req.weights);
    Json(ExplainOut { objective })
}
