use std::collections::HashMap;

use types::{Diagnostics, Email, PreferenceLoop, Student};

/// Resolves each student's preferred-partner email against the participant set, dropping
/// unresolvable entries with a diagnostic warning. Returns the out-degree-<=1 edge map
/// keyed by email.
fn resolve_edges(participants: &[Student], diagnostics: &mut Diagnostics) -> HashMap<String, String> {
    let known: std::collections::HashSet<&str> =
        participants.iter().map(|p| p.email.0.as_str()).collect();

    let mut edges = HashMap::new();
    for p in participants {
        if let Some(target) = &p.preferred_partner_email {
            if known.contains(target.0.as_str()) {
                edges.insert(p.email.0.clone(), target.0.clone());
            } else {
                diagnostics.unresolvable_preferences += 1;
                diagnostics.warn(format!(
                    "{} prefers {}, which is not in the participant set — dropped",
                    p.email.0, target.0
                ));
            }
        }
    }
    edges
}

/// Resolves preferred-partner edges and finds preference loops in one pass, so the two
/// consumers (the Model Builder's preference-satisfaction term, and the report's loop
/// listing) share a single set of "unresolvable preference" diagnostics instead of each
/// re-deriving the edge set and double-warning.
pub fn analyze(
    participants: &[Student],
    diagnostics: &mut Diagnostics,
) -> (Vec<(Email, Email)>, Vec<PreferenceLoop>) {
    let edges = resolve_edges(participants, diagnostics);
    let loops = loops_from_edges(&edges);
    let edge_list = edges
        .into_iter()
        .map(|(u, v)| (Email(u), Email(v)))
        .collect();
    (edge_list, loops)
}

/// Finds all simple directed cycles of length >= 2 in the preferred-partner graph.
///
/// Because every vertex has out-degree <= 1, each weakly connected component contains at
/// most one cycle, so a single visited/on-stack traversal per unvisited vertex suffices —
/// no general strongly-connected-components algorithm is needed. Self-preference (a vertex
/// pointing to itself) is discarded, as are open chains that never close.
pub fn find_loops(participants: &[Student], diagnostics: &mut Diagnostics) -> Vec<PreferenceLoop> {
    analyze(participants, diagnostics).1
}

fn loops_from_edges(edges: &HashMap<String, String>) -> Vec<PreferenceLoop> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        Unvisited,
        OnStack(usize),
        Done,
    }

    let mut mark: HashMap<String, Mark> =
        edges.keys().map(|k| (k.clone(), Mark::Unvisited)).collect();
    // Vertices that only appear as a target never start a walk; they're visited transitively.
    for target in edges.values() {
        mark.entry(target.clone()).or_insert(Mark::Unvisited);
    }

    let mut loops = Vec::new();

    let starts: Vec<String> = edges.keys().cloned().collect();
    for start in starts {
        if !matches!(mark.get(&start), Some(Mark::Unvisited)) {
            continue;
        }
        let mut path: Vec<String> = Vec::new();
        let mut cur = start.clone();
        loop {
            match mark.get(&cur).copied() {
                Some(Mark::Done) => {
                    for v in &path {
                        mark.insert(v.clone(), Mark::Done);
                    }
                    break;
                }
                Some(Mark::OnStack(idx)) => {
                    let cycle = &path[idx..];
                    if cycle.len() >= 2 {
                        loops.push(canonicalize(cycle));
                    }
                    for v in &path {
                        mark.insert(v.clone(), Mark::Done);
                    }
                    break;
                }
                _ => {
                    mark.insert(cur.clone(), Mark::OnStack(path.len()));
                    path.push(cur.clone());
                    match edges.get(&cur) {
                        Some(next) => cur = next.clone(),
                        None => {
                            for v in &path {
                                mark.insert(v.clone(), Mark::Done);
                            }
                            break;
                        }
                    }
                }
            }
        }
    }

    loops
}

/// Rotates the cycle to begin at the lexicographically smallest email, preserving direction.
fn canonicalize(cycle: &[String]) -> PreferenceLoop {
    let min_idx = cycle
        .iter()
        .enumerate()
        .min_by(|a, b| a.1.cmp(b.1))
        .map(|(i, _)| i)
        .unwrap_or(0);
    let mut members = Vec::with_capacity(cycle.len());
    for i in 0..cycle.len() {
        members.push(Email(cycle[(min_idx + i) % cycle.len()].clone()));
    }
    PreferenceLoop { members }
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::{MeetingPreference, Skills, StudentId};

    fn student(email: &str, prefers: Option<&str>) -> Student {
        Student {
            student_id: StudentId(email.into()),
            name: email.into(),
            email: Email(email.into()),
            github_username: None,
            skills: Skills::placeholder(),
            meeting_preference: MeetingPreference::NoPreference,
            available_times: None,
            section: None,
            preferred_partner_email: prefers.map(|e| Email(e.into())),
            is_placeholder: false,
        }
    }

    #[test]
    fn mutual_pair_is_a_loop_of_two() {
        let participants = vec![
            student("a@example.com", Some("b@example.com")),
            student("b@example.com", Some("a@example.com")),
        ];
        let mut diag = Diagnostics::default();
        let loops = find_loops(&participants, &mut diag);
        assert_eq!(loops.len(), 1);
        assert!(loops[0].is_mutual_pair());
    }

    #[test]
    fn three_cycle_is_canonicalized_to_start_at_smallest_email() {
        let participants = vec![
            student("b@example.com", Some("c@example.com")),
            student("c@example.com", Some("a@example.com")),
            student("a@example.com", Some("b@example.com")),
        ];
        let mut diag = Diagnostics::default();
        let loops = find_loops(&participants, &mut diag);
        assert_eq!(loops.len(), 1);
        let emails: Vec<&str> = loops[0].members.iter().map(|e| e.0.as_str()).collect();
        assert_eq!(emails, vec!["a@example.com", "b@example.com", "c@example.com"]);
    }

    #[test]
    fn self_preference_is_discarded() {
        let participants = vec![student("a@example.com", Some("a@example.com"))];
        let mut diag = Diagnostics::default();
        let loops = find_loops(&participants, &mut diag);
        assert!(loops.is_empty());
    }

    #[test]
    fn open_chain_produces_no_loop() {
        let participants = vec![
            student("a@example.com", Some("b@example.com")),
            student("b@example.com", None),
        ];
        let mut diag = Diagnostics::default();
        let loops = find_loops(&participants, &mut diag);
        assert!(loops.is_empty());
    }

    #[test]
    fn unresolvable_preference_is_dropped_with_a_diagnostic() {
        let participants = vec![student("a@example.com", Some("ghost@example.com"))];
        let mut diag = Diagnostics::default();
        let loops = find_loops(&participants, &mut diag);
        assert!(loops.is_empty());
        assert_eq!(diag.unresolvable_preferences, 1);
    }

    proptest::proptest! {
        #[test]
        fn loops_are_invariant_under_cyclic_rotation(shift in 0usize..4) {
            let emails = ["a@example.com", "b@example.com", "c@example.com", "d@example.com"];
            let base: Vec<Student> = (0..4)
                .map(|i| student(emails[i], Some(emails[(i + 1) % 4])))
                .collect();
            let mut rotated: Vec<Student> = Vec::with_capacity(4);
            for i in 0..4 {
                rotated.push(base[(i + shift) % 4].clone());
            }

            let mut diag_a = Diagnostics::default();
            let mut diag_b = Diagnostics::default();
            let loops_a = find_loops(&base, &mut diag_a);
            let loops_b = find_loops(&rotated, &mut diag_b);

            let emails_a: Vec<String> = loops_a[0].members.iter().map(|e| e.0.clone()).collect();
            let emails_b: Vec<String> = loops_b[0].members.iter().map(|e| e.0.clone()).collect();
            prop_assert_eq!(emails_a, emails_b);
        }
    }
}
