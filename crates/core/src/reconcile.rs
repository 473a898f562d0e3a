use std::collections::HashMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use types::{Diagnostics, Email, Student, StudentId};

use crate::errors::AssignError;

/// A roster row: just the identity triple, extra columns ignored (§6).
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, JsonSchema)]
pub struct RosterRecord {
    pub student_id: StudentId,
    pub name: String,
    pub email: Email,
}

/// Merges survey respondents with roster records.
///
/// Duplicate survey rows sharing an email are coalesced beforehand by the caller (the
/// CSV reader keeps the most recent by submission order); this function keys on email, so
/// a `survey` slice with duplicates already overwrites earlier entries with later ones.
///
/// Returns the final participant set. Roster entries absent from the survey are reported
/// via `diagnostics.missing`; when `include_missing` is set they are also synthesized as
/// placeholder participants and included in the result.
pub fn reconcile(
    survey: Vec<Student>,
    roster: &[RosterRecord],
    include_missing: bool,
    diagnostics: &mut Diagnostics,
) -> Result<Vec<Student>, AssignError> {
    if roster.is_empty() {
        return Err(AssignError::InvalidRoster {
            reason: "roster has no entries".into(),
        });
    }

    let mut by_email: HashMap<String, Student> = HashMap::new();
    for student in survey {
        if let Some(prev) = by_email.insert(student.email.0.clone(), student) {
            diagnostics.duplicate_emails_coalesced += 1;
            diagnostics.warn(format!(
                "duplicate survey response for {} — kept the most recent submission",
                prev.email.0
            ));
        }
    }

    let mut participants = Vec::with_capacity(roster.len());
    for entry in roster {
        match by_email.remove(&entry.email.0) {
            Some(student) => participants.push(student),
            None => {
                diagnostics
                    .missing
                    .push((entry.name.clone(), entry.email.clone()));
                if include_missing {
                    participants.push(Student::placeholder(
                        entry.student_id.clone(),
                        entry.name.clone(),
                        entry.email.clone(),
                    ));
                }
            }
        }
    }

    Ok(participants)
}
