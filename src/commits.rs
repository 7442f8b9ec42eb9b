use std::path::Path;

use chrono::NaiveDate;

use crate::error::MirrorError;
use crate::git::run_git_with_env;
use crate::interrupt::Interrupt;
use crate::model::Delta;

const GREEN: &str = "\x1b[32m";
const RESET: &str = "\x1b[0m";

/// Author and committer date for every commit mirrored onto `day`.
///
/// Noon UTC keeps the commit on the same calendar day for any viewer offset
/// within +-12h.
pub fn noon_timestamp(day: NaiveDate) -> String {
    format!("{}T12:00:00+00:00", day.format("%Y-%m-%d"))
}

pub fn commit_message(day: NaiveDate, index: u32, count: u32) -> String {
    format!("mirror: {} ({}/{})", day.format("%Y-%m-%d"), index, count)
}

/// Create `count` empty commits dated noon UTC on `day`, one after another.
pub fn create_commits_for_day(
    dir: &Path,
    day: NaiveDate,
    count: u32,
    interrupt: &Interrupt,
) -> Result<(), MirrorError> {
    let timestamp = noon_timestamp(day);
    let env = [
        ("GIT_AUTHOR_DATE", timestamp.as_str()),
        ("GIT_COMMITTER_DATE", timestamp.as_str()),
    ];
    for i in 1..=count {
        interrupt.check()?;
        let message = commit_message(day, i, count);
        let result = run_git_with_env(
            dir,
            &[
                "commit",
                "--allow-empty",
                "--no-gpg-sign",
                "--quiet",
                "-m",
                &message,
            ],
            &env,
        );
        interrupt.settle(result)?;
    }
    Ok(())
}

/// Apply a delta in ascending day order. Returns the number of commits created.
///
/// On failure the commits already made stay in place; the next run's delta
/// accounts for them.
pub fn emit_commits(dir: &Path, delta: &Delta, interrupt: &Interrupt) -> Result<u64, MirrorError> {
    let mut created = 0u64;
    for (&day, &count) in delta {
        create_commits_for_day(dir, day, count, interrupt)?;
        created += u64::from(count);
        log::info!("  {}: +{} commits {}✓{}", day, count, GREEN, RESET);
    }
    Ok(created)
}
