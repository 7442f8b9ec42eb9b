/*
This file implements "copiar", a tool that mirrors the daily contribution counts
of one GitHub account onto a repository owned by another account, by creating
backdated empty commits.

Key features and structure:
- Uses Clap for parsing command-line arguments; settings come from the
  environment or a .env file (see `config`).
- Fetches the contribution calendar through the GitHub GraphQL API in windows
  of at most 365 days (`contributions`).
- Makes sure the destination repository exists and prepares a local working
  copy by reusing, cloning or initialising it (`repo_state`).
- Counts commits already present per day and creates only the missing ones,
  so re-running never over- or under-shoots (`delta`, `commits`).
- Pushes the branch without ever forcing (`push`).
*/

use std::error::Error;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use clap::Parser;

pub mod commits;
pub mod config;
pub mod contributions;
pub mod delta;
pub mod error;
pub mod git;
pub mod github;
pub mod interrupt;
pub mod model;
pub mod push;
pub mod repo_state;

pub use commits::{commit_message, create_commits_for_day, emit_commits, noon_timestamp};
pub use config::Config;
pub use contributions::{fetch_contributions, fetch_user_created_at, MAX_WINDOW_DAYS};
pub use delta::{commit_day, compute_delta, load_existing_commits};
pub use error::MirrorError;
pub use git::check_git_installed;
pub use github::{ApiResponse, GitHubApi, OctocrabApi};
pub use interrupt::Interrupt;
pub use model::{ContributionMap, DateRange, Delta, RepoState};
pub use push::push_to_remote;
pub use repo_state::{ensure_repo, prepare_working_copy, resolve_repo_state, RepoTarget};

const BLUE: &str = "\x1b[94m";
const YELLOW: &str = "\x1b[93m";
const RESET: &str = "\x1b[0m";

#[derive(Parser, Debug, Default, Clone)]
#[command(
    name = "copiar",
    version,
    about = "Mirror GitHub contributions to your personal account."
)]
pub struct Cli {
    /// Start from the work account's creation date
    #[arg(long)]
    pub backfill: bool,

    /// ISO start date (default: yesterday)
    #[arg(long, value_name = "YYYY-MM-DD")]
    pub start: Option<NaiveDate>,

    /// ISO end date (default: today)
    #[arg(long, value_name = "YYYY-MM-DD")]
    pub end: Option<NaiveDate>,

    /// Fetch and print the target counts; no git operations
    #[arg(long)]
    pub dry_run: bool,

    /// Skip the confirmation prompt
    #[arg(short = 'y', long)]
    pub yes: bool,

    /// Don't delete the temporary working copy after pushing
    #[arg(long)]
    pub keep_repo: bool,

    /// Use this directory as the working copy instead of a temporary one
    #[arg(long, value_name = "PATH")]
    pub local_dir: Option<PathBuf>,

    /// Path to an alternate .env file
    #[arg(long = "env", value_name = "PATH")]
    pub env_file: Option<PathBuf>,
}

/// How a run ended when nothing went wrong.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The source account had no activity in the range.
    NoContributions,
    /// `--dry-run`: only the target map was printed.
    DryRun { days: usize, total: u64 },
    /// Every day already had its target count.
    UpToDate,
    /// The operator answered no at the prompt.
    Declined,
    /// Ctrl+C before the push; commits made so far stay in the working copy.
    Interrupted,
    /// Commits were created and pushed.
    Pushed { commits: u64 },
}

/// Accept `y` or `yes`, any case.
pub fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

/// Ask `Proceed? [y/N]` on stdin. EOF counts as no; Ctrl+C as `Interrupted`.
pub fn prompt_confirmation(interrupt: &Interrupt) -> Result<bool, MirrorError> {
    print!("Proceed? [y/N] ");
    io::stdout().flush()?;
    // stdin blocks through SIGINT, so read on a side thread and poll the flag.
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut line = String::new();
        let read = io::stdin().read_line(&mut line).map(|n| (n, line));
        let _ = tx.send(read);
    });
    loop {
        interrupt.check()?;
        match rx.recv_timeout(Duration::from_millis(100)) {
            Ok(Ok((0, _))) => return Ok(false),
            Ok(Ok((_, line))) => return Ok(is_affirmative(&line)),
            Ok(Err(e)) => return Err(e.into()),
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => return Ok(false),
        }
    }
}

/// Run the whole pipeline: fetch targets, prepare the working copy, diff,
/// commit, push.
///
/// `confirm` is asked before any commit is created unless `config.yes`.
pub fn mirror(
    config: &Config,
    api: &dyn GitHubApi,
    target: &RepoTarget,
    interrupt: &Interrupt,
    confirm: &mut dyn FnMut() -> Result<bool, MirrorError>,
) -> Result<RunOutcome, MirrorError> {
    let config = if config.wants_backfill() {
        log::info!(
            "Fetching account creation date for '{}'...",
            config.work_username
        );
        let created = fetch_user_created_at(api, &config.work_username)?;
        log::info!("Backfill start: {}", created);
        config.with_start_date(created)
    } else {
        config.clone()
    };
    let range = config.range()?;

    log::info!(
        "Fetching contributions for '{}' from {} to {}...",
        config.work_username,
        range.start(),
        range.end()
    );
    let contributions = fetch_contributions(api, &config.work_username, range)?;
    if contributions.is_empty() {
        log::info!("No contributions found in the specified date range.");
        return Ok(RunOutcome::NoContributions);
    }
    let total_target = model::total(&contributions);
    log::info!(
        "Found {} active days ({} total contributions).",
        contributions.len(),
        total_target
    );

    if config.dry_run {
        log::info!("[dry-run] Contribution delta (target counts):");
        for (day, count) in &contributions {
            log::info!("  {}: {}", day, count);
        }
        log::info!(
            "[dry-run] Would create up to {} commits across {} days.",
            total_target,
            contributions.len()
        );
        return Ok(RunOutcome::DryRun {
            days: contributions.len(),
            total: total_target,
        });
    }

    if interrupt.is_set() {
        log::info!("Interrupted.");
        return Ok(RunOutcome::Interrupted);
    }

    log::info!("Checking mirror repo '{}'...", target.name);
    let state = ensure_repo(api, target)?;
    log::debug!("Mirror repo state: {:?}", state);

    let prepared = prepare_working_copy(
        config.local_dir.as_deref(),
        &target.remote_url,
        state,
        config.keep_repo,
    );
    let working_copy = match interrupt.settle(prepared) {
        Err(MirrorError::Interrupted) => {
            log::info!("Interrupted.");
            return Ok(RunOutcome::Interrupted);
        }
        other => other?,
    };
    let outcome = apply(&config, &working_copy, &contributions, interrupt, confirm);
    working_copy.dispose();
    let outcome = match outcome {
        Err(MirrorError::Interrupted) => {
            log::info!("Interrupted.");
            RunOutcome::Interrupted
        }
        other => other?,
    };
    if let RunOutcome::Pushed { .. } = outcome {
        log::info!(
            "Done! View your profile: https://github.com/{}",
            config.personal_username
        );
    }
    Ok(outcome)
}

fn apply(
    config: &Config,
    working_copy: &repo_state::WorkingCopy,
    contributions: &ContributionMap,
    interrupt: &Interrupt,
    confirm: &mut dyn FnMut() -> Result<bool, MirrorError>,
) -> Result<RunOutcome, MirrorError> {
    let dir = working_copy.path();
    let existing = load_existing_commits(dir)?;
    let needed = compute_delta(contributions, &existing);
    if needed.is_empty() {
        log::info!("Mirror is already up to date.");
        return Ok(RunOutcome::UpToDate);
    }
    log::info!(
        "{}Commits to create:{} {}{} across {} days.{}",
        BLUE,
        RESET,
        YELLOW,
        model::total(&needed),
        needed.len(),
        RESET
    );

    if !config.yes && !confirm()? {
        log::info!("Aborted.");
        return Ok(RunOutcome::Declined);
    }

    let created = emit_commits(dir, &needed, interrupt)?;
    interrupt.check()?;
    interrupt.settle(push_to_remote(dir, git::ORIGIN))?;
    Ok(RunOutcome::Pushed { commits: created })
}

pub fn run() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    execute_cli(cli)
}

pub fn execute_cli(cli: Cli) -> Result<(), Box<dyn Error>> {
    let today = Utc::now().date_naive();
    let config = Config::load(&cli, today)?;
    let api = OctocrabApi::new(&config.personal_token)?;
    let target = RepoTarget::github(
        &config.personal_username,
        &config.target_repo,
        &config.personal_token,
    );
    let interrupt = Interrupt::install();
    let prompt_flag = interrupt.clone();
    let mut confirm = move || prompt_confirmation(&prompt_flag);
    let outcome = mirror(&config, &api, &target, &interrupt, &mut confirm)?;
    log::debug!("Run finished: {:?}", outcome);
    Ok(())
}
