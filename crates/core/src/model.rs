use std::collections::HashMap;

use types::{SoftConflictWeights, SolveEnvelope, Student};

use crate::errors::AssignError;
use crate::scoring::{self, ScalarizationBounds};

/// Derived constants and precomputed pairwise structure shared by every solver backend
/// (§4.3's "Assignment Model Builder"): participant indexing, the feasible group-size plan,
/// precomputed conflicting pairs, resolved mutual pairs / preference edges, and the
/// loops eligible for the co-location bonus. A MILP backend turns this into decision
/// variables and linear constraints; a heuristic backend turns it into a constructive
/// search space — the derived constants themselves are identical either way.
pub struct ParticipantIndex<'a> {
    pub participants: &'a [Student],
    pub n: usize,
    /// Target sizes for the groups that will actually be used, per §4.3's size-feasibility
    /// rule (not the `G_max = floor(N/3)` upper bound on slot count).
    pub size_plan: Vec<usize>,
    pub avail_conflicts: Vec<(usize, usize)>,
    pub meet_conflicts: Vec<(usize, usize)>,
    pub section_conflicts: Vec<(usize, usize)>,
    pub mutual_pairs: Vec<(usize, usize)>,
    pub pref_edges: Vec<(usize, usize)>,
    pub loops_fit: Vec<Vec<usize>>,
    pub weights: SoftConflictWeights,
    pub bounds: ScalarizationBounds,
}

impl<'a> ParticipantIndex<'a> {
    pub fn g_max(&self) -> usize {
        self.n / 3
    }

    pub fn build(env: &'a SolveEnvelope) -> Result<Self, AssignError> {
        let participants = env.participants.as_slice();
        let n = participants.len();
        if n < 3 {
            return Err(AssignError::Infeasible);
        }
        let size_plan = feasible_size_plan(n)?;
        let weights = env.config.weights;

        let index_of: HashMap<&str, usize> = participants
            .iter()
            .enumerate()
            .map(|(i, p)| (p.email.0.as_str(), i))
            .collect();

        let mut avail_conflicts = Vec::new();
        let mut meet_conflicts = Vec::new();
        let mut section_conflicts = Vec::new();
        for i in 0..n {
            for j in (i + 1)..n {
                let a = &participants[i];
                let b = &participants[j];
                if scoring::availability_conflict(a, b) {
                    avail_conflicts.push((i, j));
                }
                if scoring::meeting_conflict(a, b) {
                    meet_conflicts.push((i, j));
                }
                if scoring::section_conflict(a, b) {
                    section_conflicts.push((i, j));
                }
            }
        }

        let mutual: std::collections::HashSet<(usize, usize)> = participants
            .iter()
            .enumerate()
            .filter_map(|(i, p)| {
                let target = p.preferred_partner_email.as_ref()?;
                let j = *index_of.get(target.0.as_str())?;
                let reciprocated = participants[j]
                    .preferred_partner_email
                    .as_ref()
                    .map(|e| e.0.as_str())
                    == Some(p.email.0.as_str());
                reciprocated.then_some((i.min(j), i.max(j)))
            })
            .collect();
        let mutual_pairs: Vec<(usize, usize)> = mutual.iter().copied().collect();

        let pref_edges: Vec<(usize, usize)> = env
            .edges
            .iter()
            .filter_map(|(u, v)| {
                let ui = *index_of.get(u.0.as_str())?;
                let vi = *index_of.get(v.0.as_str())?;
                let key = (ui.min(vi), ui.max(vi));
                (!mutual.contains(&key)).then_some((ui, vi))
            })
            .collect();

        let loops_fit: Vec<Vec<usize>> = env
            .loops
            .iter()
            .filter(|l| l.len() >= 3 && l.len() <= 4)
            .filter_map(|l| {
                l.members
                    .iter()
                    .map(|e| index_of.get(e.0.as_str()).copied())
                    .collect::<Option<Vec<usize>>>()
            })
            .collect();

        let edge_count = env.edges.len() as i64;
        let bounds = ScalarizationBounds::for_instance(n as i64, (n / 3) as i64, edge_count, &weights);

        Ok(Self {
            participants,
            n,
            size_plan,
            avail_conflicts,
            meet_conflicts,
            section_conflicts,
            mutual_pairs,
            pref_edges,
            loops_fit,
            weights,
            bounds,
        })
    }
}

/// §4.3: "if N mod 4 = 0 -> all fours; N mod 4 = 3 -> one three, rest fours; N mod 4 = 2 ->
/// two threes; N mod 4 = 1 -> three threes (requires N >= 9)". Returns the target size of
/// each group slot that will be used, largest first.
pub fn feasible_size_plan(n: usize) -> Result<Vec<usize>, AssignError> {
    if n < 3 {
        return Err(AssignError::Infeasible);
    }
    let (threes, fours) = match n % 4 {
        0 => (0, n / 4),
        3 => (1, (n - 3) / 4),
        2 => (2, (n - 6) / 4),
        1 => {
            if n < 9 {
                return Err(AssignError::Infeasible);
            }
            (3, (n - 9) / 4)
        }
        _ => unreachable!(),
    };
    let mut plan = vec![4usize; fours];
    plan.extend(std::iter::repeat(3usize).take(threes));
    Ok(plan)
}
