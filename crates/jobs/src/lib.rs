use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::error;
use utoipa::ToSchema;
use uuid::Uuid;

use assign_core::{RosterRecord, Solver};
use types::{Config, Diagnostics, SolveOutcome, Student};

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize, ToSchema)]
pub struct JobId(pub String);

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize, ToSchema)]
#[serde(tag = "status")]
pub enum JobStatus {
    Queued,
    Running,
    Solved {
        outcome: SolveOutcome,
        diagnostics: Diagnostics,
    },
    Failed {
        message: String,
        exit_code: i32,
    },
}

/// The job store behind `/v1/solve`: the synchronous `Solver` trait (§5 — the core pipeline
/// is never itself async) is wrapped here in `tokio::task::spawn_blocking` rather than made
/// async, unlike the teacher's `#[async_trait]` solver. See DESIGN.md.
#[derive(Clone)]
pub struct InMemJobs<S: Solver + 'static> {
    inner: Arc<RwLock<HashMap<String, JobStatus>>>,
    solver: Arc<S>,
}

impl<S: Solver + 'static> InMemJobs<S> {
    pub fn new(solver: S) -> Self {
        Self {
            inner: Default::default(),
            solver: Arc::new(solver),
        }
    }

    pub fn enqueue(&self, survey: Vec<Student>, roster: Vec<RosterRecord>, config: Config) -> JobId {
        let id = Uuid::new_v4().to_string();
        self.inner.write().insert(id.clone(), JobStatus::Queued);

        let map = self.inner.clone();
        let solver = self.solver.clone();
        let id_for_task = id.clone();

        tokio::spawn(async move {
            map.write().insert(id_for_task.clone(), JobStatus::Running);

            let status = tokio::task::spawn_blocking(move || {
                let mut diagnostics = Diagnostics::default();
                match assign_core::run_pipeline(survey, &roster, config, solver.as_ref(), &mut diagnostics) {
                    Ok(outcome) => JobStatus::Solved { outcome, diagnostics },
                    Err(err) => JobStatus::Failed {
                        message: err.to_string(),
                        exit_code: err.exit_code(),
                    },
                }
            })
            .await
            .unwrap_or_else(|join_err| {
                error!(error = %join_err, "solver task panicked");
                JobStatus::Failed {
                    message: "solver task panicked".into(),
                    exit_code: 1,
                }
            });

            map.write().insert(id_for_task, status);
        });

        JobId(id)
    }

    pub fn get(&self, id: &str) -> Option<JobStatus> {
        self.inner.read().get(id).cloned()
    }
}
