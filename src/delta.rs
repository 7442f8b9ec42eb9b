use std::path::Path;

use chrono::{NaiveDate, TimeZone, Utc};
use git2::Repository;

use crate::error::MirrorError;
use crate::git;
use crate::model::{ContributionMap, Delta};

/// Calendar day a commit is counted under: its committer timestamp in UTC.
///
/// Neither the offset recorded in the commit nor the local time zone of the
/// machine affects the result.
pub fn commit_day(seconds: i64) -> Option<NaiveDate> {
    Utc.timestamp_opt(seconds, 0).single().map(|dt| dt.date_naive())
}

/// Count commits per committer day in a single walk from HEAD.
///
/// A repository without commits yields an empty map.
pub fn load_existing_commits(dir: &Path) -> Result<ContributionMap, MirrorError> {
    if !git::has_head(dir)? {
        return Ok(ContributionMap::new());
    }
    let repo = Repository::open(dir)?;
    let mut revwalk = repo.revwalk()?;
    revwalk.push_head()?;

    let mut counts = ContributionMap::new();
    for oid in revwalk {
        let commit = repo.find_commit(oid?)?;
        let seconds = commit.committer().when().seconds();
        let day = commit_day(seconds)
            .ok_or_else(|| git2::Error::from_str("commit has an out-of-range timestamp"))?;
        *counts.entry(day).or_insert(0) += 1;
    }
    log::debug!(
        "Existing mirror history: {} commits over {} days",
        counts.values().map(|&c| u64::from(c)).sum::<u64>(),
        counts.len()
    );
    Ok(counts)
}

/// `max(0, target - existing)` per target day; zero entries are left out.
pub fn compute_delta(target: &ContributionMap, existing: &ContributionMap) -> Delta {
    target
        .iter()
        .filter_map(|(&day, &wanted)| {
            let have = existing.get(&day).copied().unwrap_or(0);
            let missing = wanted.saturating_sub(have);
            (missing > 0).then_some((day, missing))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn late_evening_west_of_utc_counts_for_next_utc_day() {
        // 2024-01-01T23:30:00-05:00 == 2024-01-02T04:30:00Z
        let secs = Utc
            .with_ymd_and_hms(2024, 1, 2, 4, 30, 0)
            .single()
            .unwrap()
            .timestamp();
        assert_eq!(commit_day(secs), NaiveDate::from_ymd_opt(2024, 1, 2));
    }
}
