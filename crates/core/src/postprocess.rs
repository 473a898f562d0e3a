use types::{Email, Group, Student};

/// Decodes a raw slot assignment into the final `(participant, group_number)` table.
///
/// Empty slots are discarded; remaining groups are renumbered starting at 1 in ascending
/// order of their minimum member email, and members within each group are sorted by email.
/// Any participant absent from every slot is returned in `unassigned` — on a successful
/// solve this is always empty, but the post-processor reports it rather than assuming it.
pub fn postprocess(raw_groups: Vec<Vec<Email>>, participants: &[Student]) -> (Vec<Group>, Vec<Email>) {
    let mut non_empty: Vec<Vec<Email>> = raw_groups.into_iter().filter(|g| !g.is_empty()).collect();
    for g in &mut non_empty {
        g.sort_by(|a, b| a.0.cmp(&b.0));
    }
    non_empty.sort_by(|a, b| a[0].0.cmp(&b[0].0));

    let mut seen = std::collections::HashSet::new();
    let groups: Vec<Group> = non_empty
        .into_iter()
        .enumerate()
        .map(|(idx, members)| {
            for m in &members {
                seen.insert(m.0.clone());
            }
            Group {
                number: (idx + 1) as u32,
                members,
            }
        })
        .collect();

    let unassigned: Vec<Email> = participants
        .iter()
        .filter(|p| !seen.contains(&p.email.0))
        .map(|p| p.email.clone())
        .collect();

    (groups, unassigned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::{MeetingPreference, Skills, StudentId};

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
    fn renumbers_by_ascending_min_email_and_sorts_members() {
        let participants = vec![
            student("c@example.com"),
            student("a@example.com"),
            student("b@example.com"),
        ];
        let raw = vec![
            vec![Email("c@example.com".into()), Email("a@example.com".into())],
            vec![Email("b@example.com".into())],
        ];
        let (groups, unassigned) = postprocess(raw, &participants);
        assert!(unassigned.is_empty());
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].number, 1);
        assert_eq!(groups[0].members[0].0, "a@example.com");
        assert_eq!(groups[0].members[1].0, "c@example.com");
        assert_eq!(groups[1].number, 2);
    }

    #[test]
    fn empty_slots_are_discarded() {
        let participants = vec![student("a@example.com")];
        let raw = vec![vec![], vec![Email("a@example.com".into())], vec![]];
        let (groups, unassigned) = postprocess(raw, &participants);
        assert_eq!(groups.len(), 1);
        assert!(unassigned.is_empty());
    }

    #[test]
    fn unassigned_participants_are_reported() {
        let participants = vec![student("a@example.com"), student("b@example.com")];
        let raw = vec![vec![Email("a@example.com".into())]];
        let (_, unassigned) = postprocess(raw, &participants);
        assert_eq!(unassigned.len(), 1);
        assert_eq!(unassigned[0].0, "b@example.com");
    }
}
