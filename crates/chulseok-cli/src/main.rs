use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, bail};
use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use chulseok_core::validate::inspect;
use chulseok_core::{
    AttendanceReport, Pipeline, PipelineConfig, PostFetcher, RawPost, RetryPolicy, RunFilter,
    RunLog, TokioSleeper, WeeklySubmissions, deduplicate, extract_weekly_submissions,
    filter_challenge_posts, filter_recent,
};
use chulseok_store::{FilePostSource, JsonlRunLog, Roster, read_capture};
use chulseok_sync::sheets::{DEFAULT_BASE_URL, sheet_of};
use chulseok_sync::{HttpPostSource, SheetsClient};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod display;

#[derive(Parser, Debug)]
#[command(name = "chulseok")]
#[command(about = "Sync weekly challenge posts into an attendance sheet")]
#[command(version)]
struct Cli {
    /// Run history file (JSON lines)
    #[arg(long, global = true, env = "CHULSEOK_RUN_LOG", default_value = "logs/runs.jsonl")]
    run_log: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch posts, reconcile against the sheet and write attendance marks
    Run(RunArgs),
    /// Print weekly submissions from a post capture without touching the sheet
    Parse {
        #[arg(long)]
        posts_file: PathBuf,
        /// Only keep posts from the last N days
        #[arg(long, value_parser = recent_days_parser())]
        recent_days: Option<i64>,
    },
    /// Print the participant × week attendance matrix
    Report {
        #[arg(long)]
        posts_file: PathBuf,
        /// Roster file (.json or .csv)
        #[arg(long)]
        roster: PathBuf,
        #[arg(long, value_parser = recent_days_parser())]
        recent_days: Option<i64>,
    },
    /// Show recorded runs, newest first
    History {
        #[arg(long, default_value_t = 10)]
        limit: usize,
        /// Only failed runs
        #[arg(long)]
        failed: bool,
        /// Only runs started at or after this RFC 3339 time
        #[arg(long)]
        since: Option<DateTime<Utc>>,
    },
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Read posts from a capture file instead of the fetcher service
    #[arg(long)]
    posts_file: Option<PathBuf>,

    /// Compute updates without writing them
    #[arg(long)]
    dry_run: bool,

    #[arg(long, env = "CHULSEOK_SHEET_ID")]
    sheet_id: String,

    #[arg(long, env = "CHULSEOK_SHEET_TOKEN", hide_env_values = true)]
    sheet_token: String,

    #[arg(long, env = "CHULSEOK_SHEETS_URL", default_value = DEFAULT_BASE_URL)]
    sheets_url: String,

    /// Header row plus participant rows; its start cell offsets written addresses
    #[arg(long, env = "CHULSEOK_ATTENDANCE_RANGE", default_value = "출석부!A1:BZ200")]
    attendance_range: String,

    /// First column holds participant names
    #[arg(long, env = "CHULSEOK_ROSTER_RANGE", default_value = "출석부!A2:A")]
    roster_range: String,

    #[arg(long, env = "CHULSEOK_FETCHER_URL")]
    fetcher_url: Option<String>,

    #[arg(long, env = "CHULSEOK_BOARD_ID", default_value = "")]
    board_id: String,

    /// Board pages to crawl
    #[arg(long, env = "CHULSEOK_PAGES", default_value_t = 3)]
    pages: u32,

    #[command(flatten)]
    retry: RetryArgs,
}

#[derive(Args, Debug)]
struct RetryArgs {
    #[arg(long, default_value_t = 3)]
    max_attempts: u32,

    #[arg(long, default_value_t = 1000)]
    base_delay_ms: u64,

    #[arg(long, default_value_t = 5000)]
    max_delay_ms: u64,
}

/// Longest `--recent-days` window accepted, about a century.
const MAX_RECENT_DAYS: i64 = 36_500;

fn recent_days_parser() -> clap::builder::RangedI64ValueParser<i64> {
    clap::value_parser!(i64).range(0..=MAX_RECENT_DAYS)
}

impl RetryArgs {
    fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts.max(1),
            base_delay: Duration::from_millis(self.base_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    info!("chulseok v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Command::Run(args) => cmd_run(&cli.run_log, args).await,
        Command::Parse {
            posts_file,
            recent_days,
        } => cmd_parse(&posts_file, recent_days),
        Command::Report {
            posts_file,
            roster,
            recent_days,
        } => cmd_report(&posts_file, &roster, recent_days),
        Command::History {
            limit,
            failed,
            since,
        } => cmd_history(&cli.run_log, limit, failed, since),
    }
}

async fn cmd_run(run_log: &Path, args: RunArgs) -> anyhow::Result<()> {
    let log = JsonlRunLog::open(run_log)
        .with_context(|| format!("opening run log {}", run_log.display()))?;

    let fetcher: Box<dyn PostFetcher> = match (&args.posts_file, &args.fetcher_url) {
        (Some(path), _) => Box::new(FilePostSource::new(path.clone())),
        (None, Some(url)) => {
            if args.board_id.trim().is_empty() {
                bail!("--board-id (or CHULSEOK_BOARD_ID) is required when fetching posts");
            }
            Box::new(HttpPostSource::new(url.clone()))
        }
        (None, None) => {
            bail!("either --posts-file or --fetcher-url (or CHULSEOK_FETCHER_URL) is required")
        }
    };

    let mut sheets = SheetsClient::new(
        args.sheets_url,
        args.sheet_id,
        args.sheet_token,
        args.roster_range,
    );
    if let Some(sheet) = sheet_of(&args.attendance_range) {
        sheets = sheets.with_sheet(sheet);
    }

    let config = PipelineConfig {
        board_id: args.board_id,
        pages: args.pages,
        attendance_range: args.attendance_range,
        retry: args.retry.policy(),
        dry_run: args.dry_run,
    };
    let sleeper = TokioSleeper;
    let pipeline = Pipeline::new(fetcher.as_ref(), &sheets, &sleeper, &log, config);

    let outcome = pipeline.run().await;
    display::print_outcome(&outcome);
    if !outcome.success {
        bail!(
            "run {} failed: {}",
            outcome.run_id,
            outcome.error.as_deref().unwrap_or("unknown error")
        );
    }
    Ok(())
}

/// Capture file → deduplicated, classified, optionally recent posts → submissions.
fn load_submissions(posts_file: &Path, recent_days: Option<i64>) -> anyhow::Result<WeeklySubmissions> {
    let posts = read_capture(posts_file)
        .with_context(|| format!("reading post capture {}", posts_file.display()))?;
    for post in &posts {
        post.check()?;
    }
    let unique = deduplicate(posts);
    let mut challenge: Vec<RawPost> = filter_challenge_posts(unique.posts);
    if let Some(days) = recent_days {
        challenge = filter_recent(challenge, Utc::now(), days);
    }
    Ok(extract_weekly_submissions(&challenge))
}

fn cmd_parse(posts_file: &Path, recent_days: Option<i64>) -> anyhow::Result<()> {
    let submissions = load_submissions(posts_file, recent_days)?;
    display::print_submissions(&submissions);
    display::print_issues(&inspect(&submissions));
    Ok(())
}

fn cmd_report(posts_file: &Path, roster_file: &Path, recent_days: Option<i64>) -> anyhow::Result<()> {
    let roster = Roster::load(roster_file)
        .with_context(|| format!("loading roster {}", roster_file.display()))?;
    let submissions = load_submissions(posts_file, recent_days)?;
    let active = roster.active();
    let report = match &roster.challenge_info {
        Some(info) => {
            println!(
                "{} (weeks {}-{}, {} total)",
                info.name,
                info.start_week,
                info.end_week,
                info.total_weeks()
            );
            AttendanceReport::over_weeks(&submissions, &active, info.weeks())
        }
        None => AttendanceReport::build(&submissions, &active),
    };
    display::print_report(&report);
    display::print_unregistered(&unregistered(&submissions, &roster));
    Ok(())
}

/// Submitters with no roster entry.
fn unregistered<'a>(submissions: &'a WeeklySubmissions, roster: &Roster) -> BTreeSet<&'a str> {
    submissions
        .pairs()
        .map(|(_, identity)| identity)
        .filter(|identity| roster.by_nickname(identity).is_none())
        .collect()
}

fn cmd_history(
    run_log: &Path,
    limit: usize,
    failed: bool,
    since: Option<DateTime<Utc>>,
) -> anyhow::Result<()> {
    let log = JsonlRunLog::open(run_log)
        .with_context(|| format!("opening run log {}", run_log.display()))?;
    let runs = log.query(&RunFilter {
        success: failed.then_some(false),
        since,
        limit: Some(limit),
    })?;
    display::print_history(&runs);
    Ok(())
}
