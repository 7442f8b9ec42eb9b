mod common;

use common::{calendar_response, d, map, FakeGitHub};
use copiar::*;
use serde_json::json;

#[test]
fn test_fetch_queries_windows_in_order_and_merges() {
    let source = map(&[
        ("2023-01-01", 2),
        ("2023-12-31", 1),
        ("2024-01-01", 4),
        ("2024-02-04", 6),
        ("2024-03-01", 9),
    ]);
    let calendar = source.clone();
    let api = FakeGitHub::new(move |_, _, body| calendar_response(&calendar, body));

    let range = DateRange::new(d("2023-01-01"), d("2024-02-04")).unwrap();
    let got = fetch_contributions(&api, "worker", range).unwrap();

    assert_eq!(
        got,
        map(&[
            ("2023-01-01", 2),
            ("2023-12-31", 1),
            ("2024-01-01", 4),
            ("2024-02-04", 6)
        ])
    );
    let vars = api.graphql_variables();
    assert_eq!(vars.len(), 2);
    assert_eq!(vars[0]["login"], "worker");
    assert_eq!(vars[0]["from"], "2023-01-01T00:00:00Z");
    assert_eq!(vars[0]["to"], "2023-12-31T23:59:59Z");
    assert_eq!(vars[1]["from"], "2024-01-01T00:00:00Z");
    assert_eq!(vars[1]["to"], "2024-02-04T23:59:59Z");
}

#[test]
fn test_zero_count_days_are_not_returned() {
    let api = FakeGitHub::new(|_, _, _| {
        ApiResponse::new(
            200,
            json!({"data": {"user": {"contributionsCollection": {"contributionCalendar": {
                "weeks": [
                    {"contributionDays": [
                        {"date": "2024-05-01", "contributionCount": 0},
                        {"date": "2024-05-02", "contributionCount": 3}
                    ]},
                    {"contributionDays": [
                        {"date": "2024-05-08", "contributionCount": 0}
                    ]}
                ]
            }}}}}),
        )
    });
    let range = DateRange::new(d("2024-05-01"), d("2024-05-08")).unwrap();
    let got = fetch_contributions(&api, "worker", range).unwrap();
    assert_eq!(got, map(&[("2024-05-02", 3)]));
}

#[test]
fn test_unauthorized_is_fatal() {
    let api = FakeGitHub::new(|_, _, _| {
        ApiResponse::new(401, json!({"message": "Bad credentials"}))
    });
    let range = DateRange::new(d("2024-05-01"), d("2024-05-08")).unwrap();
    let err = fetch_contributions(&api, "worker", range).unwrap_err();
    assert!(matches!(err, MirrorError::Auth));
    assert!(err.to_string().contains("401"));
}

#[test]
fn test_failure_in_later_window_aborts_whole_fetch() {
    let source = map(&[("2023-01-05", 1)]);
    let api = FakeGitHub::new(move |_, _, body| {
        if body["variables"]["from"] == "2023-01-01T00:00:00Z" {
            calendar_response(&source, body)
        } else {
            ApiResponse::new(200, json!({"errors": [{"message": "something broke"}]}))
        }
    });
    let range = DateRange::new(d("2023-01-01"), d("2024-06-01")).unwrap();
    let err = fetch_contributions(&api, "worker", range).unwrap_err();
    assert!(matches!(err, MirrorError::Query(_)), "{:?}", err);
    assert_eq!(api.graphql_variables().len(), 2);
}

#[test]
fn test_unknown_account_reported_as_not_found() {
    let api = FakeGitHub::new(|_, _, _| {
        ApiResponse::new(
            200,
            json!({
                "data": {"user": null},
                "errors": [{"type": "NOT_FOUND", "message": "Could not resolve to a User with the login of 'ghost'."}]
            }),
        )
    });
    let range = DateRange::new(d("2024-05-01"), d("2024-05-01")).unwrap();
    match fetch_contributions(&api, "ghost", range) {
        Err(MirrorError::AccountNotFound(login)) => assert_eq!(login, "ghost"),
        other => panic!("unexpected: {:?}", other),
    }
}

#[test]
fn test_null_user_without_errors_is_not_found() {
    let api = FakeGitHub::new(|_, _, _| ApiResponse::new(200, json!({"data": {"user": null}})));
    let err = fetch_user_created_at(&api, "ghost").unwrap_err();
    assert!(matches!(err, MirrorError::AccountNotFound(_)));
}

#[test]
fn test_created_at_is_truncated_to_day() {
    let api = FakeGitHub::new(|_, _, body| {
        assert_eq!(body["variables"]["login"], "worker");
        ApiResponse::new(
            200,
            json!({"data": {"user": {"createdAt": "2015-03-14T21:09:26Z"}}}),
        )
    });
    assert_eq!(fetch_user_created_at(&api, "worker").unwrap(), d("2015-03-14"));
}

#[test]
fn test_days_outside_window_are_ignored() {
    let api = FakeGitHub::new(|_, _, _| {
        ApiResponse::new(
            200,
            json!({"data": {"user": {"contributionsCollection": {"contributionCalendar": {
                "weeks": [{"contributionDays": [
                    {"date": "2024-04-30", "contributionCount": 5},
                    {"date": "2024-05-01", "contributionCount": 1},
                    {"date": "2024-05-02", "contributionCount": 7}
                ]}]
            }}}}}),
        )
    });
    let range = DateRange::new(d("2024-05-01"), d("2024-05-01")).unwrap();
    let got = fetch_contributions(&api, "worker", range).unwrap();
    assert_eq!(got, map(&[("2024-05-01", 1)]));
}
