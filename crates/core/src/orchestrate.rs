use std::time::Instant;

use types::{Config, Diagnostics, Email, SolveOutcome, SolveStatus, Student};

use crate::errors::AssignError;
use crate::reconcile::{self, RosterRecord};
use crate::{postprocess, prefgraph, scoring};

/// What a solver hands back to the orchestrator before post-processing.
pub struct RawSolution {
    pub status: SolveStatus,
    pub groups: Vec<Vec<Email>>,
}

/// The Assignment Model Builder + Solver Driver, as a single synchronous call (§5: no
/// suspension points are exposed to callers — the pipeline is synchronous end to end).
/// `jobs`/`api` wrap this behind `tokio::task::spawn_blocking` rather than making it async,
/// which is the one deliberate departure from the teacher's `#[async_trait]` trait — see
/// DESIGN.md.
pub trait Solver: Send + Sync {
    fn solve(&self, env: &types::SolveEnvelope) -> Result<RawSolution, AssignError>;
}

/// Sequences Roster Reconciler -> Preference Graph Analyzer -> Solver Driver ->
/// Post-Processor, threading a `Diagnostics` bag throughout.
pub fn run_pipeline(
    survey: Vec<Student>,
    roster: &[RosterRecord],
    config: Config,
    solver: &dyn Solver,
    diagnostics: &mut Diagnostics,
) -> Result<SolveOutcome, AssignError> {
    tracing::info!(survey_rows = survey.len(), roster_rows = roster.len(), "reconciling roster");
    let t0 = Instant::now();
    let participants = reconcile::reconcile(survey, roster, config.include_missing, diagnostics)?;
    diagnostics.record_phase("reconcile", t0.elapsed().as_millis() as u64);

    tracing::info!(participants = participants.len(), "analyzing preference graph");
    let t1 = Instant::now();
    let (edges, loops) = prefgraph::analyze(&participants, diagnostics);
    diagnostics.record_phase("find_loops", t1.elapsed().as_millis() as u64);

    let env = types::SolveEnvelope {
        participants: participants.clone(),
        edges,
        loops,
        config: config.clone(),
    };

    tracing::info!(time_budget_s = config.time_budget_s, solver = ?config.solver, "invoking solver");
    let t2 = Instant::now();
    let raw = solver.solve(&env)?;
    diagnostics.record_phase("solve", t2.elapsed().as_millis() as u64);

    tracing::info!(groups = raw.groups.len(), "post-processing solution");
    let t3 = Instant::now();
    let (groups, unassigned) = postprocess::postprocess(raw.groups, &participants);
    let objective = scoring::compute_objective(&groups, &participants, &config.weights);
    diagnostics.record_phase("post_process", t3.elapsed().as_millis() as u64);

    Ok(SolveOutcome {
        status: raw.status,
        groups,
        unassigned,
        objective,
        participants,
    })
}
