use axum::{http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use assign_core::{model, reconcile, RosterRecord};
use types::{Diagnostics, Student};

/// Request body for `/v1/validate`: checks a survey/roster pair is reconcilable and
/// yields a feasible group-size plan, without running a solver (§6.6).
#[derive(Deserialize, ToSchema)]
pub struct ValidateRequest {
    pub survey: Vec<Student>,
    pub roster: Vec<RosterRecord>,
    #[serde(default)]
    pub include_missing: bool,
}

#[derive(Serialize, ToSchema)]
pub struct ValidationReport {
    pub ok: bool,
    #[serde(default)]
    pub errors: Vec<String>,
    #[serde(default)]
    pub warnings: Vec<String>,
}

#[utoipa::path(
    post,
    path = "/v1/validate",
    request_body = ValidateRequest,
    responses((status = 200, description = "Validation result", body = ValidationReport))
)]
pub async fn validate_handler(Json(req): Json<ValidateRequest>) -> (StatusCode, Json<ValidationReport>) {
    let mut diagnostics = Diagnostics::default();
    let participants = match reconcile::reconcile(req.survey, &req.roster, req.include_missing, &mut diagnostics) {
        Ok(p) => p,
        Err(err) => {
            return (
                StatusCode::OK,
                Json(ValidationReport {
                    ok: false,
                    errors: vec![err.to_string()],
                    warnings: diagnostics.warnings,
                }),
            );
        }
    };

    let mut errors = Vec::new();
    if let Err(err) = model::feasible_size_plan(participants.len()) {
        errors.push(format!("{} participants: {err}", participants.len()));
    }

    (
        StatusCode::OK,
        Json(ValidationReport {
            ok: errors.is_empty(),
            errors,
            warnings: diagnostics.warnings,
        }),
    )
}
