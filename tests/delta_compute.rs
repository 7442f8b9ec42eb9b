mod common;

use common::{d, map};
use copiar::*;

#[test]
fn test_empty_existing_yields_target_unchanged() {
    let target = map(&[("2024-01-01", 3), ("2024-01-02", 1)]);
    let delta = compute_delta(&target, &ContributionMap::new());
    assert_eq!(delta, target);
}

#[test]
fn test_fully_mirrored_day_is_omitted() {
    let target = map(&[("2024-01-01", 3), ("2024-01-02", 1)]);
    let existing = map(&[("2024-01-01", 3)]);
    let delta = compute_delta(&target, &existing);
    assert_eq!(delta, map(&[("2024-01-02", 1)]));
}

#[test]
fn test_surplus_never_goes_negative() {
    let target = map(&[("2024-01-01", 2), ("2024-01-02", 5)]);
    let existing = map(&[("2024-01-01", 7), ("2024-01-02", 4), ("2023-12-31", 9)]);
    let delta = compute_delta(&target, &existing);
    assert_eq!(delta, map(&[("2024-01-02", 1)]));
    assert!(delta.values().all(|&n| n > 0));
}

#[test]
fn test_existing_days_outside_target_are_ignored() {
    let target = map(&[("2024-02-01", 1)]);
    let existing = map(&[("2024-01-31", 4)]);
    assert_eq!(compute_delta(&target, &existing).get(&d("2024-02-01")), Some(&1));
}
