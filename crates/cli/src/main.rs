use std::fs::File;
use std::io::Write as _;
use std::path::PathBuf;

use assign_core::{io, AssignError, Solver};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use types::{Config, Diagnostics, SoftConflictWeights, SolverKind};

/// Assigns students to project groups from a survey and a course roster (§6).
#[derive(Parser, Debug)]
#[command(name = "groupsort", version, about)]
struct Cli {
    /// Survey CSV (one row per respondent, columns per §6.1)
    survey: PathBuf,

    /// Roster CSV (one row per enrolled student, columns per §6.2)
    roster: PathBuf,

    /// Where to write the assignment CSV. Defaults to stdout if omitted.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Where to write the plain-text report. Defaults to stderr if omitted.
    #[arg(long)]
    report: Option<PathBuf>,

    /// Synthesize placeholder participants for roster-only students (§4.1)
    #[arg(long)]
    include_missing: bool,

    /// Solver wall-clock budget, in seconds
    #[arg(long, default_value_t = 600)]
    time_budget_s: u64,

    /// Availability-conflict weight (must exceed --w-meet)
    #[arg(long, default_value_t = 8)]
    w_avail: i64,

    /// Meeting-mode-conflict weight (must exceed --w-section)
    #[arg(long, default_value_t = 4)]
    w_meet: i64,

    /// Section-conflict weight
    #[arg(long, default_value_t = 1)]
    w_section: i64,

    /// Solver seed, for deterministic re-runs (P9)
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Which backend to solve with
    #[arg(long, value_enum, default_value = "milp")]
    solver: SolverArg,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
enum SolverArg {
    Milp,
    Heuristic,
}

fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let weights = SoftConflictWeights {
        w_avail: cli.w_avail,
        w_meet: cli.w_meet,
        w_section: cli.w_section,
    };
    if !weights.is_strictly_ordered() {
        error!("weights must satisfy w_avail > w_meet > w_section > 0");
        std::process::exit(4);
    }

    let config = Config {
        include_missing: cli.include_missing,
        time_budget_s: cli.time_budget_s,
        weights,
        seed: cli.seed,
        solver: match cli.solver {
            SolverArg::Milp => SolverKind::Milp,
            SolverArg::Heuristic => SolverKind::Heuristic,
        },
    };

    let mut diagnostics = Diagnostics::default();

    let survey_file = File::open(&cli.survey).unwrap_or_else(|e| {
        error!(path = %cli.survey.display(), error = %e, "could not open survey file");
        std::process::exit(4);
    });
    let roster_file = File::open(&cli.roster).unwrap_or_else(|e| {
        error!(path = %cli.roster.display(), error = %e, "could not open roster file");
        std::process::exit(4);
    });

    let survey = io::read_survey_csv(survey_file, &mut diagnostics).unwrap_or_else(|e| exit_on_error(e));
    let roster = io::read_roster_csv(roster_file, &mut diagnostics).unwrap_or_else(|e| exit_on_error(e));
    info!(survey_rows = survey.len(), roster_rows = roster.len(), "loaded input files");

    let solver: Box<dyn Solver> = match config.solver {
        SolverKind::Milp => Box::new(solver_milp::MilpSolver::new()),
        SolverKind::Heuristic => Box::new(solver_heur::HeurSolver::new()),
    };

    let outcome = match assign_core::run_pipeline(survey, &roster, config, solver.as_ref(), &mut diagnostics) {
        Ok(outcome) => outcome,
        Err(e) => exit_on_error(e),
    };
    let participants = &outcome.participants;

    // Loops are recomputed here (rather than threaded out of `run_pipeline`) purely for the
    // report's human-readable listing; this re-derivation is deterministic and warning-free
    // since the participant set is already reconciled and every edge was already resolved once.
    let (_, loops) = assign_core::prefgraph::analyze(participants, &mut Diagnostics::default());

    match &cli.output {
        Some(path) => {
            let file = File::create(path).unwrap_or_else(|e| {
                error!(path = %path.display(), error = %e, "could not create output file");
                std::process::exit(1);
            });
            io::write_assignment_csv(file, &outcome.groups, participants).unwrap_or_else(|e| exit_on_error(e));
        }
        None => {
            io::write_assignment_csv(std::io::stdout(), &outcome.groups, participants)
                .unwrap_or_else(|e| exit_on_error(e));
        }
    }

    let report = io::render_report(participants, &outcome, &loops, &diagnostics);
    match &cli.report {
        Some(path) => {
            let mut file = File::create(path).unwrap_or_else(|e| {
                error!(path = %path.display(), error = %e, "could not create report file");
                std::process::exit(1);
            });
            let _ = file.write_all(report.as_bytes());
        }
        None => {
            eprint!("{report}");
        }
    }

    info!(status = ?outcome.status, groups = outcome.groups.len(), "done");
    std::process::exit(exitcode::OK);
}

fn exit_on_error(err: AssignError) -> ! {
    error!(error = %err, "assignment failed");
    std::process::exit(err.exit_code());
}
