use thiserror::Error;

/// Fatal failures of the pipeline. Recoverable conditions (duplicate emails, unresolvable
/// preferences, dropped survey rows) are accumulated in `types::Diagnostics` instead.
#[derive(Debug, Error)]
pub enum AssignError {
    #[error("invalid survey row: {reason}")]
    InvalidSurveyRow { reason: String },

    #[error("invalid roster: {reason}")]
    InvalidRoster { reason: String },

    #[error("no assignment satisfies the hard constraints")]
    Infeasible,

    #[error("solver time budget elapsed before any feasible solution was found")]
    SolverTimeout,

    #[error("internal solver error: {0}")]
    InternalSolverError(String),
}

impl AssignError {
    /// Exit status per §6: 0 success, 2 Infeasible, 3 SolverTimeout, 4 validation failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            AssignError::Infeasible => 2,
            AssignError::SolverTimeout => 3,
            AssignError::InvalidSurveyRow { .. } | AssignError::InvalidRoster { .. } => 4,
            AssignError::InternalSolverError(_) => 1,
        }
    }
}
