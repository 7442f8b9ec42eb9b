use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate};

use crate::error::MirrorError;

/// Calendar day -> activity count. A missing day means zero.
///
/// Backed by a `BTreeMap` so iteration is always in ascending day order.
pub type ContributionMap = BTreeMap<NaiveDate, u32>;

/// Calendar day -> number of commits still needed (always > 0).
pub type Delta = BTreeMap<NaiveDate, u32>;

/// Inclusive `[start, end]` span of calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, MirrorError> {
        if start > end {
            return Err(MirrorError::Config(format!(
                "start date {} is after end date {}",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Number of days covered, counting both ends.
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    pub fn contains(&self, day: NaiveDate) -> bool {
        self.start <= day && day <= self.end
    }

    /// Split into consecutive windows of at most `max_days` days.
    ///
    /// Window `i + 1` starts the day after window `i` ends; together they
    /// cover the range exactly once.
    pub fn windows(&self, max_days: u32) -> Vec<DateRange> {
        let span = Duration::days(i64::from(max_days.max(1)) - 1);
        let mut out = Vec::new();
        let mut chunk_start = self.start;
        loop {
            let chunk_end = chunk_start
                .checked_add_signed(span)
                .map_or(self.end, |d| d.min(self.end));
            out.push(DateRange {
                start: chunk_start,
                end: chunk_end,
            });
            if chunk_end >= self.end {
                break;
            }
            match chunk_end.succ_opt() {
                Some(next) => chunk_start = next,
                None => break,
            }
        }
        out
    }
}

/// Condition of the destination repository at the start of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepoState {
    Absent,
    ExistsEmpty,
    ExistsWithHistory,
}

impl RepoState {
    pub fn has_history(self) -> bool {
        self == RepoState::ExistsWithHistory
    }
}

/// Sum of all counts in a map.
pub fn total(map: &BTreeMap<NaiveDate, u32>) -> u64 {
    map.values().map(|&c| u64::from(c)).sum()
}
