//! `beadkeep` command-line entry point.
//!
//! # Responsibility
//! - Parse flags and environment into job requests.
//! - Select the tracker backend and optional file logging.
//! - Print per-item progress and summaries; map outcomes to exit codes.
//!
//! # Invariants
//! - Exit `0` on full success, `1` on any per-item or tracker failure and
//!   `2` on missing or malformed input.

use beadkeep_core::logging::init_logging;
use beadkeep_core::metrics::{
    default_db_path, local_today, run_routing_report, write_report, MetricsError,
    RoutingReportRequest,
};
use beadkeep_core::report::OutputFormat;
use beadkeep_core::service::{
    backfill_protocol, CommitReplayService, DocMappingRequest, DocMappingService,
    LabelBackfillRequest, LabelBackfillService, LineSink, RoadmapReplayService, ServiceError,
    Stream, DEFAULT_TARGETS,
};
use beadkeep_core::tracker::bd_cli::DEFAULT_BD_PROGRAM;
use beadkeep_core::{default_log_level, BdCli, SqliteTracker, StatusFilter, Tracker};
use clap::{Parser, Subcommand, ValueEnum};
use log::info;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::rc::Rc;

const EXIT_FAILURE: u8 = 1;
const EXIT_INPUT: u8 = 2;
const DEFAULT_REPORT_CSV: &str = "beadkeep/brainstorm-plan-bead-map.csv";

#[derive(Parser, Debug)]
#[command(
    name = "beadkeep",
    version,
    about = "Maintenance jobs for a beads issue tracker",
    propagate_version = true
)]
struct Cli {
    /// Tracker CLI used when no tracker database is given.
    #[arg(long, global = true, env = "BEADKEEP_BD_BIN", default_value = DEFAULT_BD_PROGRAM)]
    bd_bin: PathBuf,
    /// Talk to a local SQLite tracker database instead of the tracker CLI.
    #[arg(long, global = true, env = "BEADKEEP_TRACKER_DB")]
    tracker_db: Option<PathBuf>,
    /// Absolute directory for rotating log files; logging is off without it.
    #[arg(long, global = true, env = "BEADKEEP_LOG_DIR")]
    log_dir: Option<PathBuf>,
    #[arg(long, global = true, env = "BEADKEEP_LOG_LEVEL")]
    log_level: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Attach module and theme labels derived from record text.
    BackfillLabels {
        #[arg(long)]
        dry_run: bool,
        /// Process at most N records (0 = all).
        #[arg(long, default_value_t = 0)]
        limit: u32,
        #[arg(long, value_enum, default_value_t = StatusArg::All)]
        status: StatusArg,
        #[arg(long, default_value_t = beadkeep_core::reconcile::DEFAULT_BATCH_SIZE)]
        batch_size: usize,
    },
    /// Create placeholders for ids listed in a commit manifest CSV.
    ReplayCommits {
        /// Manifest with columns id,repo,commit,date,subject.
        #[arg(long)]
        csv: PathBuf,
        #[arg(long)]
        dry_run: bool,
    },
    /// Create placeholders for ids referenced by roadmap documents.
    ReplayRoadmap {
        #[arg(long)]
        root: Option<PathBuf>,
        #[arg(long)]
        dry_run: bool,
    },
    /// Map brainstorm and plan documents onto records via notes.
    MapDocs {
        #[arg(long)]
        root: Option<PathBuf>,
        #[arg(long)]
        dry_run: bool,
        /// Report missing ids instead of creating placeholders.
        #[arg(long)]
        no_create_missing: bool,
        /// Only use explicit `Bead:` declarations.
        #[arg(long)]
        no_infer: bool,
        #[arg(long)]
        report_csv: Option<PathBuf>,
    },
    /// Insert the Philosophy Alignment Protocol into AGENTS.md files.
    BackfillProtocol {
        #[arg(long)]
        root: Option<PathBuf>,
        /// Target path relative to root; repeatable.
        #[arg(long = "target")]
        targets: Vec<String>,
        #[arg(long)]
        dry_run: bool,
    },
    /// Compare actual and role-routed model costs of review runs.
    RoutingReport {
        #[arg(long)]
        db: Option<PathBuf>,
        #[arg(long)]
        shadow_dir: Option<PathBuf>,
        /// Timestamp prefix, e.g. 2026-02-23.
        #[arg(long)]
        session_filter: Option<String>,
        #[arg(long, value_enum, default_value_t = FormatArg::Plain)]
        format: FormatArg,
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum StatusArg {
    All,
    Open,
    Closed,
}

impl From<StatusArg> for StatusFilter {
    fn from(value: StatusArg) -> Self {
        match value {
            StatusArg::All => Self::All,
            StatusArg::Open => Self::Open,
            StatusArg::Closed => Self::Closed,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum FormatArg {
    Plain,
    Markdown,
}

impl From<FormatArg> for OutputFormat {
    fn from(value: FormatArg) -> Self {
        match value {
            FormatArg::Plain => Self::Plain,
            FormatArg::Markdown => Self::Markdown,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Some(log_dir) = &cli.log_dir {
        let level = cli.log_level.as_deref().unwrap_or(default_log_level());
        if let Err(err) = init_logging(level, log_dir) {
            return input_error(err);
        }
    }
    info!("event=command_start module=cli status=start command={:?}", cli.command);

    match &cli.command {
        Commands::BackfillLabels {
            dry_run,
            limit,
            status,
            batch_size,
        } => with_tracker(&cli, |tracker| {
            let request = LabelBackfillRequest {
                status: (*status).into(),
                limit: *limit,
                batch_size: *batch_size,
                dry_run: *dry_run,
            };
            let report = LabelBackfillService::new(tracker)
                .with_progress(console())
                .run(request)?;
            println!("\n{report}");
            Ok(report.failed)
        }),
        Commands::ReplayCommits { csv, dry_run } => with_tracker(&cli, |tracker| {
            let report = CommitReplayService::new(tracker)
                .with_progress(console())
                .run(csv, *dry_run)?;
            println!("{report}");
            Ok(report.failed)
        }),
        Commands::ReplayRoadmap { root, dry_run } => {
            let root = match resolve_root(root.as_deref()) {
                Ok(root) => root,
                Err(code) => return code,
            };
            with_tracker(&cli, |tracker| {
                let report = RoadmapReplayService::new(tracker)
                    .with_progress(console())
                    .run(&root, *dry_run)?;
                println!("{report}");
                Ok(report.failed)
            })
        }
        Commands::MapDocs {
            root,
            dry_run,
            no_create_missing,
            no_infer,
            report_csv,
        } => {
            let root = match resolve_root(root.as_deref()) {
                Ok(root) => root,
                Err(code) => return code,
            };
            let request = DocMappingRequest {
                root,
                report_csv: report_csv
                    .clone()
                    .unwrap_or_else(|| std::env::temp_dir().join(DEFAULT_REPORT_CSV)),
                dry_run: *dry_run,
                create_missing: !*no_create_missing,
                infer: !*no_infer,
            };
            with_tracker(&cli, |tracker| {
                let report = DocMappingService::new(tracker)
                    .with_progress(console())
                    .run(&request)?;
                println!("{report}");
                Ok(report.errors)
            })
        }
        Commands::BackfillProtocol {
            root,
            targets,
            dry_run,
        } => {
            let root = match resolve_root(root.as_deref()) {
                Ok(root) => root,
                Err(code) => return code,
            };
            let report = if targets.is_empty() {
                backfill_protocol(&root, DEFAULT_TARGETS, *dry_run, Some(console()))
            } else {
                backfill_protocol(&root, targets.as_slice(), *dry_run, Some(console()))
            };
            println!("\n{report}");
            failure_code(report.failed)
        }
        Commands::RoutingReport {
            db,
            shadow_dir,
            session_filter,
            format,
            output,
        } => {
            let Some(db) = db.clone().or_else(default_db_path) else {
                return input_error("no --db given and no home directory to default from");
            };
            let request = RoutingReportRequest {
                db,
                shadow_dir: shadow_dir.clone(),
                session_filter: session_filter.clone(),
                format: (*format).into(),
            };
            routing_report(&request, output.as_deref())
        }
    }
}

/// Opens the configured tracker and runs `job`; `job` returns the
/// failure count.
fn with_tracker<F>(cli: &Cli, job: F) -> ExitCode
where
    F: FnOnce(Box<dyn Tracker>) -> Result<usize, ServiceError>,
{
    let tracker: Box<dyn Tracker> = match &cli.tracker_db {
        Some(path) => {
            if !path.is_file() {
                return input_error(format!("tracker database not found: {}", path.display()));
            }
            match SqliteTracker::open(path) {
                Ok(tracker) => Box::new(tracker),
                Err(err) => {
                    eprintln!("error: {err}");
                    return ExitCode::from(EXIT_FAILURE);
                }
            }
        }
        None => Box::new(BdCli::new(cli.bd_bin.clone())),
    };

    match job(tracker) {
        Ok(failed) => failure_code(failed),
        Err(err) => {
            eprintln!("error: {err}");
            if err.is_input_error() {
                ExitCode::from(EXIT_INPUT)
            } else {
                ExitCode::from(EXIT_FAILURE)
            }
        }
    }
}

fn routing_report(request: &RoutingReportRequest, output: Option<&Path>) -> ExitCode {
    let report = match run_routing_report(request, local_today()) {
        Ok(report) => report,
        Err(err) => return metrics_error(err),
    };
    match output {
        Some(path) => match write_report(path, &report) {
            Ok(()) => {
                eprintln!("Report written to {}", path.display());
                ExitCode::SUCCESS
            }
            Err(err) => metrics_error(err),
        },
        None => {
            println!("{report}");
            ExitCode::SUCCESS
        }
    }
}

fn metrics_error(err: MetricsError) -> ExitCode {
    if let MetricsError::NoData = err {
        eprintln!("{err}");
        return ExitCode::from(EXIT_FAILURE);
    }
    eprintln!("Error: {err}");
    if err.is_input_error() {
        ExitCode::from(EXIT_INPUT)
    } else {
        ExitCode::from(EXIT_FAILURE)
    }
}

fn resolve_root(root: Option<&Path>) -> Result<PathBuf, ExitCode> {
    match root {
        Some(root) => Ok(root.to_path_buf()),
        None => std::env::current_dir()
            .map_err(|err| input_error(format!("cannot resolve working directory: {err}"))),
    }
}

/// Prints progress lines to stdout/stderr as jobs produce them.
fn console() -> LineSink {
    Rc::new(|stream: Stream, line: &str| match stream {
        Stream::Stdout => println!("{line}"),
        Stream::Stderr => eprintln!("{line}"),
    })
}

fn failure_code(failed: usize) -> ExitCode {
    if failed > 0 {
        ExitCode::from(EXIT_FAILURE)
    } else {
        ExitCode::SUCCESS
    }
}

fn input_error(message: impl Display) -> ExitCode {
    eprintln!("error: {message}");
    ExitCode::from(EXIT_INPUT)
}
