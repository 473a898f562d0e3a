#![allow(clippy::needless_range_loop)]

use std::collections::HashMap;

use good_lp::{Expression, ProblemVariables, ResolutionError, Solution, SolverModel, Variable};

use assign_core::model::ParticipantIndex;
use assign_core::AssignError;
use types::{Email, PreferenceLoop, SolveEnvelope};

const BIG_M: f64 = 1000.0;

/// The MILP builder works directly off the shared `ParticipantIndex` (§4.3's derived
/// constants); `g_max` here is `ParticipantIndex::g_max()`, the upper bound on slot count,
/// not the feasible size plan the heuristic backend uses for its constructive search.
pub(crate) type Prep<'a> = ParticipantIndex<'a>;

pub(crate) struct Vars {
    pub x: Vec<Vec<Variable>>,
    pub used: Vec<Variable>,
    pub four: Vec<Variable>,
    pub c_avail: HashMap<(usize, usize, usize), Variable>,
    pub c_meet: HashMap<(usize, usize, usize), Variable>,
    pub c_section: HashMap<(usize, usize, usize), Variable>,
    pub p: HashMap<(usize, usize, usize), Variable>,
    pub l: HashMap<(usize, usize), Variable>,
    pub t_max: Variable,
    pub t_min: Variable,
}

pub(crate) fn build_prep(env: &SolveEnvelope) -> Result<Prep, AssignError> {
    ParticipantIndex::build(env)
}

pub(crate) fn declare_x_vars(prep: &Prep, vars: &mut ProblemVariables) -> Vec<Vec<Variable>> {
    (0..prep.n)
        .map(|_| (0..prep.g_max()).map(|_| vars.add(good_lp::variable().binary())).collect())
        .collect()
}

pub(crate) fn declare_used_four_vars(prep: &Prep, vars: &mut ProblemVariables) -> (Vec<Variable>, Vec<Variable>) {
    let used = (0..prep.g_max()).map(|_| vars.add(good_lp::variable().binary())).collect();
    let four = (0..prep.g_max()).map(|_| vars.add(good_lp::variable().binary())).collect();
    (used, four)
}

fn declare_conflict_vars(
    pairs: &[(usize, usize)],
    g_max: usize,
    vars: &mut ProblemVariables,
) -> HashMap<(usize, usize, usize), Variable> {
    let mut map = HashMap::new();
    for &(i, j) in pairs {
        for g in 0..g_max {
            map.insert((i, j, g), vars.add(good_lp::variable().binary()));
        }
    }
    map
}

pub(crate) fn declare_pref_vars(prep: &Prep, vars: &mut ProblemVariables) -> HashMap<(usize, usize, usize), Variable> {
    let mut map = HashMap::new();
    for &(u, v) in &prep.pref_edges {
        for g in 0..prep.g_max() {
            map.insert((u, v, g), vars.add(good_lp::variable().binary()));
        }
    }
    map
}

pub(crate) fn declare_loop_vars(prep: &Prep, vars: &mut ProblemVariables) -> HashMap<(usize, usize), Variable> {
    let mut map = HashMap::new();
    for (li, _loop_members) in prep.loops_fit.iter().enumerate() {
        for g in 0..prep.g_max() {
            map.insert((li, g), vars.add(good_lp::variable().binary()));
        }
    }
    map
}

pub(crate) fn build_vars(prep: &Prep, pvars: &mut ProblemVariables) -> Vars {
    let x = declare_x_vars(prep, pvars);
    let (used, four) = declare_used_four_vars(prep, pvars);
    let c_avail = declare_conflict_vars(&prep.avail_conflicts, prep.g_max(), pvars);
    let c_meet = declare_conflict_vars(&prep.meet_conflicts, prep.g_max(), pvars);
    let c_section = declare_conflict_vars(&prep.section_conflicts, prep.g_max(), pvars);
    let p = declare_pref_vars(prep, pvars);
    let l = declare_loop_vars(prep, pvars);
    let t_max = pvars.add(good_lp::variable().min(0.0));
    let t_min = pvars.add(good_lp::variable().min(0.0));
    Vars { x, used, four, c_avail, c_meet, c_section, p, l, t_max, t_min }
}

fn group_skill_total(prep: &Prep, v: &Vars, g: usize) -> Expression {
    let mut e = Expression::from(0.0);
    for s in 0..prep.n {
        let total = prep.participants[s].skills.total() as f64;
        e = e + total * v.x[s][g];
    }
    e
}

fn group_size(v: &Vars, g: usize, n: usize) -> Expression {
    let mut e = Expression::from(0.0);
    for s in 0..n {
        e = e + v.x[s][g];
    }
    e
}

pub(crate) fn add_exactly_one_constraints<M: SolverModel>(mut model: M, prep: &Prep, v: &Vars) -> M {
    for s in 0..prep.n {
        let mut sum = Expression::from(0.0);
        for g in 0..prep.g_max() {
            sum = sum + v.x[s][g];
        }
        model = model.with(sum.eq(1.0));
    }
    model
}

pub(crate) fn add_size_bound_constraints<M: SolverModel>(mut model: M, prep: &Prep, v: &Vars) -> M {
    for g in 0..prep.g_max() {
        let size = group_size(v, g, prep.n);
        model = model.with((size.clone() - 3.0 * v.used[g]).geq(0.0));
        model = model.with((size - 4.0 * v.used[g]).leq(0.0));
    }
    model
}

pub(crate) fn add_four_definition_constraints<M: SolverModel>(mut model: M, prep: &Prep, v: &Vars) -> M {
    for g in 0..prep.g_max() {
        let size = group_size(v, g, prep.n);
        model = model.with((size.clone() - 4.0 * v.four[g]).geq(0.0));
        model = model.with((size - 3.0 - v.four[g]).leq(0.0));
    }
    model
}

pub(crate) fn add_skill_floor_constraints<M: SolverModel>(mut model: M, prep: &Prep, v: &Vars) -> M {
    for g in 0..prep.g_max() {
        let total = group_skill_total(prep, v, g);
        let size = group_size(v, g, prep.n);
        model = model.with((total - 5.0 * size).geq(0.0));
    }
    model
}

pub(crate) fn add_placeholder_dispersion_constraints<M: SolverModel>(mut model: M, prep: &Prep, v: &Vars) -> M {
    for g in 0..prep.g_max() {
        let mut sum = Expression::from(0.0);
        for s in 0..prep.n {
            if prep.participants[s].is_placeholder {
                sum = sum + v.x[s][g];
            }
        }
        model = model.with(sum.leq(1.0));
    }
    model
}

pub(crate) fn add_mutual_colocation_constraints<M: SolverModel>(mut model: M, prep: &Prep, v: &Vars) -> M {
    for &(a, b) in &prep.mutual_pairs {
        for g in 0..prep.g_max() {
            model = model.with((v.x[a][g] - v.x[b][g]).eq(0.0));
        }
    }
    model
}

fn add_conflict_linearization<M: SolverModel>(
    mut model: M,
    pairs: &[(usize, usize)],
    g_max: usize,
    x: &[Vec<Variable>],
    literals: &HashMap<(usize, usize, usize), Variable>,
) -> M {
    for &(i, j) in pairs {
        for g in 0..g_max {
            let c = literals[&(i, j, g)];
            model = model.with((c - x[i][g]).leq(0.0));
            model = model.with((c - x[j][g]).leq(0.0));
            model = model.with((c - x[i][g] - x[j][g]).geq(-1.0));
        }
    }
    model
}

pub(crate) fn add_conflict_literal_constraints<M: SolverModel>(mut model: M, prep: &Prep, v: &Vars) -> M {
    model = add_conflict_linearization(model, &prep.avail_conflicts, prep.g_max(), &v.x, &v.c_avail);
    model = add_conflict_linearization(model, &prep.meet_conflicts, prep.g_max(), &v.x, &v.c_meet);
    model = add_conflict_linearization(model, &prep.section_conflicts, prep.g_max(), &v.x, &v.c_section);
    model
}

pub(crate) fn add_pref_indicator_constraints<M: SolverModel>(mut model: M, prep: &Prep, v: &Vars) -> M {
    for &(u, w) in &prep.pref_edges {
        for g in 0..prep.g_max() {
            let p = v.p[&(u, w, g)];
            model = model.with((p - v.x[u][g]).leq(0.0));
            model = model.with((p - v.x[w][g]).leq(0.0));
        }
    }
    model
}

pub(crate) fn add_loop_colocation_constraints<M: SolverModel>(mut model: M, prep: &Prep, v: &Vars) -> M {
    for (li, members) in prep.loops_fit.iter().enumerate() {
        for g in 0..prep.g_max() {
            let l = v.l[&(li, g)];
            for &s in members {
                model = model.with((l - v.x[s][g]).leq(0.0));
            }
        }
    }
    model
}

pub(crate) fn add_skill_spread_constraints<M: SolverModel>(mut model: M, prep: &Prep, v: &Vars) -> M {
    for g in 0..prep.g_max() {
        let total = group_skill_total(prep, v, g);
        model = model.with((Expression::from(v.t_max) - total.clone()).geq(0.0));
        model = model.with((Expression::from(v.t_min) - total - BIG_M * (1.0 - v.used[g])).leq(0.0));
    }
    model
}

/// §4.3's scalarized lexicographic objective, reusing `assign_core::scoring`'s derivation of
/// K1 > K2 > K3 so the MILP's optimum and the reported `ObjectiveBreakdown` agree on scale.
pub(crate) fn build_objective(prep: &Prep, v: &Vars) -> Expression {
    let k3 = 1i64;
    let k2 = prep.bounds.u_c.max(1) * (prep.bounds.u_s.max(1) + 1);
    let k1 = prep.bounds.u_p.max(1) * k2 + k2;

    let mut four_sum = Expression::from(0.0);
    for g in 0..prep.g_max() {
        four_sum = four_sum + v.four[g];
    }

    let mut pref_sum = Expression::from(0.0);
    for &(u, w) in &prep.pref_edges {
        for g in 0..prep.g_max() {
            pref_sum = pref_sum + v.p[&(u, w, g)];
        }
    }
    for (li, _) in prep.loops_fit.iter().enumerate() {
        for g in 0..prep.g_max() {
            pref_sum = pref_sum + v.l[&(li, g)];
        }
    }

    let mut soft_cost = Expression::from(0.0);
    for &var in v.c_avail.values() {
        soft_cost = soft_cost + prep.weights.w_avail as f64 * var;
    }
    for &var in v.c_meet.values() {
        soft_cost = soft_cost + prep.weights.w_meet as f64 * var;
    }
    for &var in v.c_section.values() {
        soft_cost = soft_cost + prep.weights.w_section as f64 * var;
    }

    let spread = Expression::from(v.t_max) - Expression::from(v.t_min);

    (k1 as f64) * (Expression::from(prep.g_max() as f64) - four_sum)
        + (k2 as f64) * ((prep.bounds.u_p as f64) - pref_sum)
        + (k3 as f64) * (prep.bounds.u_s as f64) * soft_cost
        + (k3 as f64) * spread
}

pub(crate) fn extract_groups(prep: &Prep, v: &Vars, sol: &impl Solution) -> Vec<Vec<Email>> {
    (0..prep.g_max())
        .map(|g| {
            (0..prep.n)
                .filter(|&s| sol.value(v.x[s][g]) > 0.5)
                .map(|s| prep.participants[s].email.clone())
                .collect()
        })
        .collect()
}

pub(crate) fn classify_resolution_error(err: ResolutionError) -> AssignError {
    match err {
        ResolutionError::Infeasible => AssignError::Infeasible,
        ResolutionError::Unbounded => AssignError::InternalSolverError("model reported unbounded".into()),
        other => {
            // CBC surfaces "ran out of time with no incumbent" through its generic error
            // path rather than a dedicated variant; absent a feasible solution, that is
            // exactly what §4.4 calls SolverTimeout.
            tracing::warn!(error = %other, "treating solver error as time budget exhaustion");
            AssignError::SolverTimeout
        }
    }
}

#[allow(dead_code)]
pub(crate) fn loop_member_emails(l: &PreferenceLoop) -> Vec<Email> {
    l.members.clone()
}
