use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(
            Clone, Debug, Serialize, Deserialize, ToSchema, JsonSchema, Eq, PartialEq, Ord, PartialOrd, Hash,
        )]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

id_newtype!(StudentId);
id_newtype!(Email);
id_newtype!(TimeSlotId);
id_newtype!(SectionId);

/// What is your meeting preference? — mapped by prefix match at parse time.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, ToSchema, JsonSchema, Eq, PartialEq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MeetingPreference {
    InPerson,
    Remote,
    NoPreference,
}

impl Default for MeetingPreference {
    fn default() -> Self {
        MeetingPreference::NoPreference
    }
}

/// Integer rating in 1..=5 for one of the three surveyed skills.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, ToSchema, JsonSchema, Eq, PartialEq, Hash)]
#[serde(transparent)]
pub struct SkillRating(pub u8);

impl SkillRating {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;
    pub const PLACEHOLDER: u8 = 2;

    pub fn in_range(value: u8) -> bool {
        (Self::MIN..=Self::MAX).contains(&value)
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, ToSchema, JsonSchema)]
pub struct Skills {
    pub ruby: SkillRating,
    pub html_css: SkillRating,
    pub javascript: SkillRating,
}

impl Skills {
    pub fn placeholder() -> Self {
        Self {
            ruby: SkillRating(SkillRating::PLACEHOLDER),
            html_css: SkillRating(SkillRating::PLACEHOLDER),
            javascript: SkillRating(SkillRating::PLACEHOLDER),
        }
    }

    pub fn total(&self) -> i64 {
        self.ruby.0 as i64 + self.html_css.0 as i64 + self.javascript.0 as i64
    }
}

/// A survey/roster participant, reconciled into a single record by the Roster Reconciler.
///
/// `available_times` is `None` for "unknown" (never conflicts) and `Some(empty set)` for
/// "known to have no free slots" (conflicts with any other non-empty, disjoint set).
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, JsonSchema)]
pub struct Student {
    pub student_id: StudentId,
    pub name: String,
    pub email: Email,
    #[serde(default)]
    pub github_username: Option<String>,
    pub skills: Skills,
    pub meeting_preference: MeetingPreference,
    #[serde(default)]
    pub available_times: Option<Vec<TimeSlotId>>,
    #[serde(default)]
    pub section: Option<SectionId>,
    #[serde(default)]
    pub preferred_partner_email: Option<Email>,
    #[serde(default)]
    pub is_placeholder: bool,
}

impl Student {
    pub fn placeholder(student_id: StudentId, name: String, email: Email) -> Self {
        Self {
            student_id,
            name,
            email,
            github_username: None,
            skills: Skills::placeholder(),
            meeting_preference: MeetingPreference::NoPreference,
            available_times: None,
            section: None,
            preferred_partner_email: None,
            is_placeholder: true,
        }
    }
}

/// A directed cycle of length >= 2 in the preferred-partner graph, in canonical orientation
/// (rotated to begin at the lexicographically smallest email).
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, JsonSchema)]
pub struct PreferenceLoop {
    pub members: Vec<Email>,
}

impl PreferenceLoop {
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn is_mutual_pair(&self) -> bool {
        self.members.len() == 2
    }
}

/// A final project group: its members and the stable number assigned by the Post-Processor.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, JsonSchema)]
pub struct Group {
    pub number: u32,
    pub members: Vec<Email>,
}

impl Group {
    pub fn size(&self) -> usize {
        self.members.len()
    }
}

/// w_avail > w_meet > w_section, process-wide and immutable during a run.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, ToSchema, JsonSchema)]
pub struct SoftConflictWeights {
    pub w_avail: i64,
    pub w_meet: i64,
    pub w_section: i64,
}

impl Default for SoftConflictWeights {
    fn default() -> Self {
        Self {
            w_avail: 8,
            w_meet: 4,
            w_section: 1,
        }
    }
}

impl SoftConflictWeights {
    pub fn is_strictly_ordered(&self) -> bool {
        self.w_avail > self.w_meet && self.w_meet > self.w_section && self.w_section > 0
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, ToSchema, JsonSchema, Eq, PartialEq)]
pub enum SolverKind {
    Milp,
    Heuristic,
}

/// Run-wide configuration: §6's recognized options plus the solver selection.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, JsonSchema)]
pub struct Config {
    #[serde(default)]
    pub include_missing: bool,
    #[serde(default = "Config::default_time_budget_s")]
    pub time_budget_s: u64,
    #[serde(default)]
    pub weights: SoftConflictWeights,
    #[serde(default)]
    pub seed: u64,
    #[serde(default = "Config::default_solver")]
    pub solver: SolverKind,
}

impl Config {
    fn default_time_budget_s() -> u64 {
        600
    }

    fn default_solver() -> SolverKind {
        SolverKind::Milp
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            include_missing: false,
            time_budget_s: Self::default_time_budget_s(),
            weights: SoftConflictWeights::default(),
            seed: 0,
            solver: Self::default_solver(),
        }
    }
}

/// Everything the Assignment Model Builder and Solver Driver need for one run.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, JsonSchema)]
pub struct SolveEnvelope {
    pub participants: Vec<Student>,
    /// Resolved directed preferred-partner edges (u -> v), one per student with a
    /// resolvable preference. Mutual pairs appear as two edges, one each direction.
    pub edges: Vec<(Email, Email)>,
    pub loops: Vec<PreferenceLoop>,
    pub config: Config,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, ToSchema, JsonSchema, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum SolveStatus {
    Solved,
    TimeLimit,
    Infeasible,
    SolverTimeout,
}

/// The four lexicographic objective components, each already in "smaller is better" form
/// except `four_groups` and `honored_preferences`, which the report inverts for display.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, ToSchema, JsonSchema)]
pub struct ObjectiveBreakdown {
    pub four_groups: i64,
    pub honored_preferences: i64,
    pub soft_cost: i64,
    pub skill_spread: i64,
}

/// The final participants the solver ran over (post-reconciliation, including any
/// synthesized placeholders) travel with the outcome so a caller can render the assignment
/// table and report without re-deriving the reconciled set itself.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, JsonSchema)]
pub struct SolveOutcome {
    pub status: SolveStatus,
    pub groups: Vec<Group>,
    pub unassigned: Vec<Email>,
    pub objective: ObjectiveBreakdown,
    pub participants: Vec<Student>,
}

/// Recoverable warnings and phase timing, threaded through the Orchestrator and rendered
/// in the report; never affects exit status.
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema, JsonSchema)]
pub struct Diagnostics {
    pub warnings: Vec<String>,
    pub missing: Vec<(String, Email)>,
    pub duplicate_emails_coalesced: u32,
    pub unresolvable_preferences: u32,
    /// Wall-clock milliseconds spent in each named pipeline phase (§4.6's "elapsed times"),
    /// in the order the Orchestrator ran them.
    pub phase_timings_ms: Vec<(String, u64)>,
}

impl Diagnostics {
    pub fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    pub fn record_phase(&mut self, name: impl Into<String>, elapsed_ms: u64) {
        self.phase_timings_ms.push((name.into(), elapsed_ms));
    }
}
