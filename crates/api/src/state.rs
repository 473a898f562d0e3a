use std::sync::Arc;

use assign_core::{AssignError, RawSolution, Solver};
use jobs::InMemJobs;
use solver_heur::HeurSolver;
use solver_milp::MilpSolver;
use types::{SolveEnvelope, SolverKind};

#[derive(Clone)]
pub struct AppState {
    pub jobs: Arc<InMemJobs<DispatchSolver>>,
}

/// Picks the MILP or heuristic backend per `Config::solver` (§4.4); both already satisfy
/// the synchronous `Solver` trait, so no per-request async dispatch is needed.
pub struct DispatchSolver {
    milp: MilpSolver,
    heur: HeurSolver,
}

impl DispatchSolver {
    pub fn new() -> Self {
        Self {
            milp: MilpSolver::new(),
            heur: HeurSolver::new(),
        }
    }
}

impl Default for DispatchSolver {
    fn default() -> Self {
        Self::new()
    }
}

impl Solver for DispatchSolver {
    fn solve(&self, env: &SolveEnvelope) -> Result<RawSolution, AssignError> {
        match env.config.solver {
            SolverKind::Milp => self.milp.solve(env),
            SolverKind::Heuristic => self.heur.solve(env),
        }
    }
}

impl AppState {
    pub fn new_default() -> Self {
        Self {
            jobs: Arc::new(InMemJobs::new(DispatchSolver::new())),
        }
    }
}
