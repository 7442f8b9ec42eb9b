use std::path::{Path, PathBuf};

use chrono::{Duration, NaiveDate};

use crate::error::MirrorError;
use crate::model::DateRange;
use crate::Cli;

pub const ENV_TOKEN: &str = "PERSONAL_GITHUB_TOKEN";
pub const ENV_WORK_USERNAME: &str = "WORK_GITHUB_USERNAME";
pub const ENV_PERSONAL_USERNAME: &str = "PERSONAL_GITHUB_USERNAME";
pub const ENV_TARGET_REPO: &str = "TARGET_REPO_NAME";
pub const ENV_START_DATE: &str = "START_DATE";
pub const ENV_END_DATE: &str = "END_DATE";
pub const ENV_LOCAL_DIR: &str = "LOCAL_REPO_DIR";

/// Settings for one run. Immutable; use the `with_*` methods to derive a changed copy.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub personal_token: String,
    pub work_username: String,
    pub personal_username: String,
    pub target_repo: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// `--start` was given on the command line; backfill does not override it.
    pub start_from_cli: bool,
    pub local_dir: Option<PathBuf>,
    pub dry_run: bool,
    pub yes: bool,
    pub keep_repo: bool,
    pub backfill: bool,
}

impl Config {
    /// Build from CLI flags and an environment lookup. Flags win over the
    /// environment; start defaults to yesterday and end to `today`.
    pub fn from_lookup<F>(cli: &Cli, lookup: F, today: NaiveDate) -> Result<Self, MirrorError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let require = |key: &str| {
            get(key).ok_or_else(|| {
                MirrorError::Config(format!(
                    "{} is required (set in env or .env file).",
                    key
                ))
            })
        };

        let personal_token = require(ENV_TOKEN)?;
        let work_username = require(ENV_WORK_USERNAME)?;
        let personal_username = require(ENV_PERSONAL_USERNAME)?;
        let target_repo = require(ENV_TARGET_REPO)?;

        let start_date = match (cli.start, get(ENV_START_DATE)) {
            (Some(d), _) => d,
            (None, Some(s)) => parse_date(&s)?,
            (None, None) => today - Duration::days(1),
        };
        let end_date = match (cli.end, get(ENV_END_DATE)) {
            (Some(d), _) => d,
            (None, Some(s)) => parse_date(&s)?,
            (None, None) => today,
        };
        let local_dir = cli
            .local_dir
            .clone()
            .or_else(|| get(ENV_LOCAL_DIR).map(PathBuf::from));

        Ok(Self {
            personal_token,
            work_username,
            personal_username,
            target_repo,
            start_date,
            end_date,
            start_from_cli: cli.start.is_some(),
            local_dir,
            dry_run: cli.dry_run,
            yes: cli.yes,
            keep_repo: cli.keep_repo,
            backfill: cli.backfill,
        })
    }

    /// Load the env file (if any) and read the process environment.
    pub fn load(cli: &Cli, today: NaiveDate) -> Result<Self, MirrorError> {
        load_env_file(cli.env_file.as_deref())?;
        Self::from_lookup(cli, |key| std::env::var(key).ok(), today)
    }

    pub fn with_start_date(&self, start_date: NaiveDate) -> Self {
        Self {
            start_date,
            ..self.clone()
        }
    }

    /// Backfill applies only when no explicit `--start` was passed.
    pub fn wants_backfill(&self) -> bool {
        self.backfill && !self.start_from_cli
    }

    pub fn range(&self) -> Result<DateRange, MirrorError> {
        DateRange::new(self.start_date, self.end_date)
    }
}

/// Load `path`, or `.env` from the current directory when no path is given.
///
/// Variables already present in the environment are not overridden. A missing
/// default `.env` is fine; a missing explicit file is an error.
pub fn load_env_file(path: Option<&Path>) -> Result<(), MirrorError> {
    match path {
        Some(p) => {
            dotenvy::from_path(p).map_err(|e| {
                MirrorError::Config(format!("cannot load env file '{}': {}", p.display(), e))
            })?;
            log::debug!("Loaded environment from '{}'", p.display());
        }
        None => {
            if let Ok(p) = dotenvy::dotenv() {
                log::debug!("Loaded environment from '{}'", p.display());
            }
        }
    }
    Ok(())
}

/// Parse an ISO `YYYY-MM-DD` date.
pub fn parse_date(s: &str) -> Result<NaiveDate, MirrorError> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|e| MirrorError::Config(format!("invalid date '{}': {}", s, e)))
}
