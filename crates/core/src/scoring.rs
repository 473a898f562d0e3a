use std::collections::HashMap;

use types::{Group, MeetingPreference, ObjectiveBreakdown, PreferenceLoop, SoftConflictWeights, Student};

/// §4.3's three pairwise soft-conflict predicates. Unknown availability never conflicts;
/// a known-empty availability set does, against any other non-empty set disjoint from it.
pub fn availability_conflict(a: &Student, b: &Student) -> bool {
    match (&a.available_times, &b.available_times) {
        (Some(ta), Some(tb)) => !ta.is_empty() && !tb.is_empty() && !ta.iter().any(|t| tb.contains(t)),
        _ => false,
    }
}

pub fn meeting_conflict(a: &Student, b: &Student) -> bool {
    matches!(
        (a.meeting_preference, b.meeting_preference),
        (MeetingPreference::InPerson, MeetingPreference::Remote)
            | (MeetingPreference::Remote, MeetingPreference::InPerson)
    )
}

pub fn section_conflict(a: &Student, b: &Student) -> bool {
    match (&a.section, &b.section) {
        (Some(sa), Some(sb)) => sa != sb,
        _ => false,
    }
}

/// Weighted soft cost `C` over every unordered pair sharing a group.
pub fn soft_cost(groups: &[Group], by_email: &HashMap<&str, &Student>, weights: &SoftConflictWeights) -> i64 {
    let mut cost = 0i64;
    for group in groups {
        for i in 0..group.members.len() {
            for j in (i + 1)..group.members.len() {
                let a = by_email[group.members[i].0.as_str()];
                let b = by_email[group.members[j].0.as_str()];
                if availability_conflict(a, b) {
                    cost += weights.w_avail;
                }
                if meeting_conflict(a, b) {
                    cost += weights.w_meet;
                }
                if section_conflict(a, b) {
                    cost += weights.w_section;
                }
            }
        }
    }
    cost
}

/// Count of preferred-partner edges honored by co-location, excluding mutual pairs (which
/// are enforced as a hard constraint and so are honored unconditionally).
pub fn honored_preferences(groups: &[Group], participants: &[Student]) -> i64 {
    let group_of: HashMap<&str, usize> = groups
        .iter()
        .enumerate()
        .flat_map(|(idx, g)| g.members.iter().map(move |e| (e.0.as_str(), idx)))
        .collect();

    let mutual: std::collections::HashSet<(&str, &str)> = participants
        .iter()
        .filter_map(|p| {
            let target = p.preferred_partner_email.as_ref()?;
            let reciprocated = participants.iter().any(|q| {
                q.email.0 == target.0
                    && q.preferred_partner_email.as_deref().map(|e| e.0.as_str()) == Some(p.email.0.as_str())
            });
            reciprocated.then_some((p.email.0.as_str(), target.0.as_str()))
        })
        .collect();

    let mut honored = 0i64;
    for p in participants {
        let Some(target) = &p.preferred_partner_email else {
            continue;
        };
        if mutual.contains(&(p.email.0.as_str(), target.0.as_str())) {
            continue;
        }
        if let (Some(gu), Some(gv)) = (
            group_of.get(p.email.0.as_str()),
            group_of.get(target.0.as_str()),
        ) {
            if gu == gv {
                honored += 1;
            }
        }
    }
    honored
}

/// `T_max - T_min` over groups that actually have members.
pub fn skill_spread(groups: &[Group], by_email: &HashMap<&str, &Student>) -> i64 {
    let totals: Vec<i64> = groups
        .iter()
        .filter(|g| !g.members.is_empty())
        .map(|g| {
            g.members
                .iter()
                .map(|e| by_email[e.0.as_str()].skills.total())
                .sum()
        })
        .collect();
    match (totals.iter().max(), totals.iter().min()) {
        (Some(max), Some(min)) => max - min,
        _ => 0,
    }
}

/// Computes all four lexicographic components for a finished assignment. Used by the
/// orchestrator to populate `SolveOutcome::objective`, by the explain route, and by the
/// heuristic solver to rank candidates.
pub fn compute_objective(
    groups: &[Group],
    participants: &[Student],
    weights: &SoftConflictWeights,
) -> ObjectiveBreakdown {
    let by_email: HashMap<&str, &Student> = participants.iter().map(|p| (p.email.0.as_str(), p)).collect();
    ObjectiveBreakdown {
        four_groups: groups.iter().filter(|g| g.size() == 4).count() as i64,
        honored_preferences: honored_preferences(groups, participants),
        soft_cost: soft_cost(groups, &by_email, weights),
        skill_spread: skill_spread(groups, &by_email),
    }
}

/// True iff `a` lexicographically dominates or ties `b` on every earlier priority and
/// does not regress on the rest: (1) more size-4 groups, (2) more honored preferences,
/// (3) lower soft cost, (4) lower skill spread.
pub fn is_at_least_as_good(a: &ObjectiveBreakdown, b: &ObjectiveBreakdown) -> bool {
    use std::cmp::Ordering::*;
    match a.four_groups.cmp(&b.four_groups) {
        Greater => return true,
        Less => return false,
        Equal => {}
    }
    match a.honored_preferences.cmp(&b.honored_preferences) {
        Greater => return true,
        Less => return false,
        Equal => {}
    }
    match a.soft_cost.cmp(&b.soft_cost) {
        Less => return true,
        Greater => return false,
        Equal => {}
    }
    a.skill_spread <= b.skill_spread
}

/// Counts loops of length 3 or 4 whose members all landed in a single group; loops longer
/// than 4 cannot fit and contribute nothing (§4.3).
pub fn loops_colocated(groups: &[Group], loops: &[PreferenceLoop]) -> i64 {
    let group_of: HashMap<&str, usize> = groups
        .iter()
        .enumerate()
        .flat_map(|(idx, g)| g.members.iter().map(move |e| (e.0.as_str(), idx)))
        .collect();

    loops
        .iter()
        .filter(|l| l.len() >= 3 && l.len() <= 4)
        .filter(|l| {
            let mut slots = l.members.iter().map(|e| group_of.get(e.0.as_str()));
            let first = slots.next().flatten();
            first.is_some() && slots.all(|s| s == first)
        })
        .count() as i64
}

/// Upper bounds for the separating constants K1 > K2 > K3 (§4.3), derived from the instance
/// size so the scalarized objective never lets a lower-priority term leak into a
/// higher-priority one.
pub struct ScalarizationBounds {
    pub u_p: i64,
    pub u_c: i64,
    pub u_s: i64,
}

impl ScalarizationBounds {
    pub fn for_instance(n: i64, g_max: i64, edge_count: i64, weights: &SoftConflictWeights) -> Self {
        Self {
            u_p: edge_count * g_max.max(1),
            u_c: (weights.w_avail + weights.w_meet + weights.w_section) * n * n,
            u_s: 15 * n,
        }
    }
}

/// Scalarized weighted objective (§4.3): `K1*(G_max - four) + K2*(U_P - P - colocated) +
/// U_S*C + S`, minimized. `loops_colocated` rewards fully co-located preference loops at a
/// priority between O2 and O3, per §4.3's "loop co-location (soft)" clause.
pub fn scalarized_objective(
    objective: &ObjectiveBreakdown,
    g_max: i64,
    bounds: &ScalarizationBounds,
    loops_colocated: i64,
) -> i64 {
    let k3 = 1i64;
    let k2 = bounds.u_c.max(1) * (bounds.u_s.max(1) + 1);
    let k1 = bounds.u_p.max(1) * k2 + k2;

    k1 * (g_max - objective.four_groups)
        + k2 * (bounds.u_p - objective.honored_preferences - loops_colocated)
        + k3 * bounds.u_s * objective.soft_cost
        + k3 * objective.skill_spread
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::{Email, SectionId, Skills, StudentId, TimeSlotId};

    fn student(email: &str) -> Student {
        Student {
            student_id: StudentId(email.into()),
            name: email.into(),
            email: Email(email.into()),
            github_username: None,
            skills: Skills::placeholder(),
            meeting_preference: MeetingPreference::NoPreference,
            available_times: None,
            section: None,
            preferred_partner_email: None,
            is_placeholder: false,
        }
    }

    #[test]
    fn unknown_availability_never_conflicts() {
        let a = student("a@example.com");
        let b = student("b@example.com");
        assert!(!availability_conflict(&a, &b));
    }

    #[test]
    fn known_disjoint_nonempty_availability_conflicts() {
        let mut a = student("a@example.com");
        a.available_times = Some(vec![TimeSlotId("mon.1".into())]);
        let mut b = student("b@example.com");
        b.available_times = Some(vec![TimeSlotId("tue.1".into())]);
        assert!(availability_conflict(&a, &b));
    }

    #[test]
    fn meeting_conflict_only_between_in_person_and_remote() {
        let mut a = student("a@example.com");
        a.meeting_preference = MeetingPreference::InPerson;
        let mut b = student("b@example.com");
        b.meeting_preference = MeetingPreference::Remote;
        assert!(meeting_conflict(&a, &b));
        b.meeting_preference = MeetingPreference::NoPreference;
        assert!(!meeting_conflict(&a, &b));
    }

    #[test]
    fn section_conflict_requires_both_known_and_different() {
        let mut a = student("a@example.com");
        let mut b = student("b@example.com");
        assert!(!section_conflict(&a, &b));
        a.section = Some(SectionId("S1".into()));
        assert!(!section_conflict(&a, &b));
        b.section = Some(SectionId("S2".into()));
        assert!(section_conflict(&a, &b));
        b.section = Some(SectionId("S1".into()));
        assert!(!section_conflict(&a, &b));
    }

    #[test]
    fn swapping_avail_for_meet_conflict_strictly_reduces_cost() {
        // P8: with w_avail > w_meet, replacing an availability conflict with a meeting
        // conflict (all else equal) must strictly reduce C.
        let weights = SoftConflictWeights::default();
        let mut a = student("a@example.com");
        let mut b = student("b@example.com");
        a.available_times = Some(vec![TimeSlotId("mon.1".into())]);
        b.available_times = Some(vec![TimeSlotId("tue.1".into())]);
        let group = Group {
            number: 1,
            members: vec![a.email.clone(), b.email.clone()],
        };
        let by_email: HashMap<&str, &Student> =
            [(a.email.0.as_str(), &a), (b.email.0.as_str(), &b)].into_iter().collect();
        let cost_avail = soft_cost(std::slice::from_ref(&group), &by_email, &weights);

        let mut a2 = a.clone();
        let mut b2 = b.clone();
        a2.available_times = None;
        b2.available_times = None;
        a2.meeting_preference = MeetingPreference::InPerson;
        b2.meeting_preference = MeetingPreference::Remote;
        let by_email2: HashMap<&str, &Student> =
            [(a2.email.0.as_str(), &a2), (b2.email.0.as_str(), &b2)].into_iter().collect();
        let cost_meet = soft_cost(std::slice::from_ref(&group), &by_email2, &weights);

        assert!(cost_meet < cost_avail);
    }
}
