use std::collections::{HashMap, HashSet};
use std::fmt::Write as _;
use std::io::{Read, Write};

use types::{
    Diagnostics, Email, Group, MeetingPreference, PreferenceLoop, SectionId, SkillRating, Skills,
    SolveOutcome, Student, StudentId, TimeSlotId,
};

use crate::errors::AssignError;
use crate::reconcile::RosterRecord;

const SURVEY_REQUIRED: &[&str] = &[
    "student id",
    "name",
    "email",
    "github username",
    "preferred partner email",
    "ruby skill",
    "html/css skill",
    "javascript skill",
    "meeting preference",
    "available times",
    "section",
];

const ROSTER_REQUIRED: &[&str] = &["student id", "name", "email"];

fn normalize(header: &str) -> String {
    header.trim().to_lowercase()
}

fn header_index(headers: &csv::StringRecord, required: &[&str]) -> Result<HashMap<String, usize>, String> {
    let mut idx = HashMap::new();
    for (i, h) in headers.iter().enumerate() {
        idx.insert(normalize(h), i);
    }
    let missing: Vec<&str> = required.iter().filter(|c| !idx.contains_key(**c)).copied().collect();
    if !missing.is_empty() {
        return Err(format!("missing required column(s): {}", missing.join(", ")));
    }
    Ok(idx)
}

fn cell<'a>(record: &'a csv::StringRecord, idx: &HashMap<String, usize>, col: &str) -> Option<&'a str> {
    idx.get(col).and_then(|&i| record.get(i)).map(|s| s.trim()).filter(|s| !s.is_empty())
}

fn parse_skill(raw: Option<&str>) -> Result<SkillRating, String> {
    let raw = raw.ok_or_else(|| "missing skill value".to_string())?;
    let value: u8 = raw.parse().map_err(|_| format!("skill value is not an integer: {raw}"))?;
    if !SkillRating::in_range(value) {
        return Err(format!("skill value out of range 1..5: {value}"));
    }
    Ok(SkillRating(value))
}

fn parse_meeting(raw: Option<&str>, diagnostics: &mut Diagnostics, row: usize) -> MeetingPreference {
    let Some(raw) = raw else { return MeetingPreference::NoPreference };
    let lower = raw.to_lowercase();
    if lower.starts_with("in person") {
        MeetingPreference::InPerson
    } else if lower.starts_with("remote") {
        MeetingPreference::Remote
    } else if lower.starts_with("no preference") {
        MeetingPreference::NoPreference
    } else {
        diagnostics.warn(format!(
            "survey row {row}: unrecognized meeting preference '{raw}' — treated as no preference"
        ));
        MeetingPreference::NoPreference
    }
}

fn parse_available_times(raw: Option<&str>) -> Option<Vec<TimeSlotId>> {
    raw.map(|s| {
        s.split(',')
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .map(|t| TimeSlotId(t.to_string()))
            .collect()
    })
}

fn parse_survey_row(
    record: &csv::StringRecord,
    idx: &HashMap<String, usize>,
    row: usize,
    diagnostics: &mut Diagnostics,
) -> Result<Student, String> {
    let student_id = cell(record, idx, "student id").ok_or("missing student id")?;
    let name = cell(record, idx, "name").ok_or("missing name")?;
    let email = cell(record, idx, "email").ok_or("missing email")?.to_lowercase();

    let ruby = parse_skill(cell(record, idx, "ruby skill"))?;
    let html_css = parse_skill(cell(record, idx, "html/css skill"))?;
    let javascript = parse_skill(cell(record, idx, "javascript skill"))?;

    let meeting_preference = parse_meeting(cell(record, idx, "meeting preference"), diagnostics, row);
    let available_times = parse_available_times(cell(record, idx, "available times"));
    let section = cell(record, idx, "section").map(|s| SectionId(s.to_string()));
    let github_username = cell(record, idx, "github username").map(|s| s.to_string());
    let preferred_partner_email = cell(record, idx, "preferred partner email").map(|s| Email(s.to_lowercase()));

    Ok(Student {
        student_id: StudentId(student_id.to_string()),
        name: name.to_string(),
        email: Email(email),
        github_username,
        skills: Skills { ruby, html_css, javascript },
        meeting_preference,
        available_times,
        section,
        preferred_partner_email,
        is_placeholder: false,
    })
}

/// Reads the survey CSV (§6.1). Header matching is case-insensitive and whitespace-trimmed.
/// Per-row parse failures (bad skill values, unreadable rows) are dropped with a diagnostic
/// warning rather than aborting the run; a missing required column is fatal.
pub fn read_survey_csv<R: Read>(reader: R, diagnostics: &mut Diagnostics) -> Result<Vec<Student>, AssignError> {
    let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers = rdr
        .headers()
        .map_err(|e| AssignError::InvalidSurveyRow { reason: e.to_string() })?
        .clone();
    let idx = header_index(&headers, SURVEY_REQUIRED).map_err(|reason| AssignError::InvalidSurveyRow { reason })?;

    let mut students = Vec::new();
    for (offset, result) in rdr.records().enumerate() {
        let row = offset + 2; // +1 for 0-index, +1 for the header line
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                diagnostics.warn(format!("survey row {row} unreadable ({e}) — skipped"));
                continue;
            }
        };
        match parse_survey_row(&record, &idx, row, diagnostics) {
            Ok(student) => students.push(student),
            Err(reason) => diagnostics.warn(format!("survey row {row} dropped: {reason}")),
        }
    }
    Ok(students)
}

/// Reads the roster CSV (§6.2). Extra columns are ignored; a missing identity column
/// (`Student ID`, `Name`, `Email`) is fatal.
pub fn read_roster_csv<R: Read>(reader: R, diagnostics: &mut Diagnostics) -> Result<Vec<RosterRecord>, AssignError> {
    let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers = rdr
        .headers()
        .map_err(|e| AssignError::InvalidRoster { reason: e.to_string() })?
        .clone();
    let idx = header_index(&headers, ROSTER_REQUIRED).map_err(|reason| AssignError::InvalidRoster { reason })?;

    let mut records = Vec::new();
    for (offset, result) in rdr.records().enumerate() {
        let row = offset + 2;
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                diagnostics.warn(format!("roster row {row} unreadable ({e}) — skipped"));
                continue;
            }
        };
        let student_id = cell(&record, &idx, "student id");
        let name = cell(&record, &idx, "name");
        let email = cell(&record, &idx, "email");
        match (student_id, name, email) {
            (Some(student_id), Some(name), Some(email)) => records.push(RosterRecord {
                student_id: StudentId(student_id.to_string()),
                name: name.to_string(),
                email: Email(email.to_lowercase()),
            }),
            _ => diagnostics.warn(format!("roster row {row} missing a required value — skipped")),
        }
    }
    Ok(records)
}

/// Writes the final assignment table (§6.3), already sorted by the post-processor.
pub fn write_assignment_csv<W: Write>(
    writer: W,
    groups: &[Group],
    participants: &[Student],
) -> Result<(), AssignError> {
    let by_email: HashMap<&str, &Student> = participants.iter().map(|p| (p.email.0.as_str(), p)).collect();
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);
    wtr.write_record([
        "Group Number",
        "Email Address",
        "What is your name?",
        "What is your student ID?",
        "What is your github.com username?",
    ])
    .map_err(|e| AssignError::InternalSolverError(e.to_string()))?;

    for group in groups {
        for email in &group.members {
            let student = by_email
                .get(email.0.as_str())
                .ok_or_else(|| AssignError::InternalSolverError(format!("group references unknown email {}", email.0)))?;
            wtr.write_record([
                group.number.to_string(),
                student.email.0.clone(),
                student.name.clone(),
                student.student_id.0.clone(),
                student.github_username.clone().unwrap_or_default(),
            ])
            .map_err(|e| AssignError::InternalSolverError(e.to_string()))?;
        }
    }
    wtr.flush().map_err(|e| AssignError::InternalSolverError(e.to_string()))?;
    Ok(())
}

/// Renders the fixed-order plain-text report (§6.4). `diagnostics` warnings (duplicate
/// emails coalesced, unresolvable preferences, dropped rows — §7) are appended after the
/// fixed sections; they never affect exit status, only what the reader sees.
pub fn render_report(
    participants: &[Student],
    outcome: &SolveOutcome,
    loops: &[PreferenceLoop],
    diagnostics: &Diagnostics,
) -> String {
    let by_email: HashMap<&str, &Student> = participants.iter().map(|p| (p.email.0.as_str(), p)).collect();
    let size3 = outcome.groups.iter().filter(|g| g.size() == 3).count();
    let size4 = outcome.groups.iter().filter(|g| g.size() == 4).count();
    let loop_members: HashSet<&str> = loops.iter().flat_map(|l| l.members.iter().map(|e| e.0.as_str())).collect();

    let mut out = String::new();
    let _ = writeln!(out, "Total students processed: {}", participants.len());
    let _ = writeln!(out, "Groups formed: {}", outcome.groups.len());
    let _ = writeln!(out, "Size-3 groups: {size3}");
    let _ = writeln!(out, "Size-4 groups: {size4}");
    let _ = writeln!(out, "Students in a preference loop: {}", loop_members.len());
    let _ = writeln!(out);

    let _ = writeln!(out, "Unassigned students:");
    for email in &outcome.unassigned {
        let name = by_email.get(email.0.as_str()).map(|s| s.name.as_str()).unwrap_or("?");
        let _ = writeln!(out, "{name}  {}", email.0);
    }
    let _ = writeln!(out);

    let _ = writeln!(
        out,
        "Detected {} preference loop(s) involving {} students:",
        loops.len(),
        loop_members.len()
    );
    for l in loops {
        let names: Vec<&str> = l
            .members
            .iter()
            .map(|e| by_email.get(e.0.as_str()).map(|s| s.name.as_str()).unwrap_or(e.0.as_str()))
            .collect();
        let mut chain = names.join(" -> ");
        if let Some(first) = names.first() {
            chain.push_str(" -> ");
            chain.push_str(first);
        }
        let _ = writeln!(out, "{chain}");
    }

    if !diagnostics.warnings.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Warnings:");
        for warning in &diagnostics.warnings {
            let _ = writeln!(out, "{warning}");
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn survey_header_matching_is_case_insensitive_and_trimmed() {
        let csv = "Student ID, Name ,Email,GitHub Username,Preferred Partner Email,Ruby Skill,HTML/CSS Skill,JavaScript Skill,Meeting Preference,Available Times,Section\n\
                   1,Ada,ADA@example.com,adalovelace,,3,4,5,In Person,\"mon.1,tue.2\",A\n";
        let mut diag = Diagnostics::default();
        let students = read_survey_csv(csv.as_bytes(), &mut diag).unwrap();
        assert_eq!(students.len(), 1);
        assert_eq!(students[0].email.0, "ada@example.com");
        assert_eq!(students[0].skills.total(), 12);
        assert!(matches!(students[0].meeting_preference, MeetingPreference::InPerson));
        assert_eq!(students[0].available_times.as_ref().unwrap().len(), 2);
    }

    #[test]
    fn out_of_range_skill_drops_the_row_with_a_warning() {
        let csv = "Student ID,Name,Email,GitHub Username,Preferred Partner Email,Ruby Skill,HTML/CSS Skill,JavaScript Skill,Meeting Preference,Available Times,Section\n\
                   1,Ada,ada@example.com,,,9,4,5,Remote,,A\n";
        let mut diag = Diagnostics::default();
        let students = read_survey_csv(csv.as_bytes(), &mut diag).unwrap();
        assert!(students.is_empty());
        assert_eq!(diag.warnings.len(), 1);
    }

    #[test]
    fn missing_required_column_is_fatal() {
        let csv = "Name,Email\nAda,ada@example.com\n";
        let mut diag = Diagnostics::default();
        let err = read_survey_csv(csv.as_bytes(), &mut diag).unwrap_err();
        assert!(matches!(err, AssignError::InvalidSurveyRow { .. }));
    }

    #[test]
    fn report_sections_appear_in_fixed_order() {
        let participants = vec![];
        let outcome = SolveOutcome {
            status: types::SolveStatus::Solved,
            groups: vec![],
            unassigned: vec![],
            objective: Default::default(),
            participants: vec![],
        };
        let diagnostics = Diagnostics::default();
        let report = render_report(&participants, &outcome, &[], &diagnostics);
        let lines: Vec<&str> = report.lines().collect();
        assert!(lines[0].starts_with("Total students processed"));
        assert!(lines[1].starts_with("Groups formed"));
        assert!(lines[2].starts_with("Size-3 groups"));
        assert!(lines[3].starts_with("Size-4 groups"));
        assert!(lines[4].starts_with("Students in a preference loop"));
        assert!(report.contains("Unassigned students:"));
        assert!(report.contains("preference loop(s) involving"));
    }

    #[test]
    fn warnings_are_appended_after_the_fixed_sections() {
        let participants = vec![];
        let outcome = SolveOutcome {
            status: types::SolveStatus::Solved,
            groups: vec![],
            unassigned: vec![],
            objective: Default::default(),
            participants: vec![],
        };
        let mut diagnostics = Diagnostics::default();
        diagnostics.warn("duplicate survey response for a@example.com — kept the most recent submission");
        let report = render_report(&participants, &outcome, &[], &diagnostics);
        assert!(report.contains("Warnings:"));
        assert!(report.contains("duplicate survey response for a@example.com"));
        assert!(report.find("Warnings:").unwrap() > report.find("preference loop(s) involving").unwrap());
    }
}
