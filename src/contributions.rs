use chrono::NaiveDate;
use serde_json::{json, Value};

use crate::error::MirrorError;
use crate::github::{GitHubApi, GRAPHQL_ROUTE};
use crate::model::{ContributionMap, DateRange};

/// The contribution calendar refuses ranges longer than this.
pub const MAX_WINDOW_DAYS: u32 = 365;

const CREATED_AT_QUERY: &str = r#"
query($login: String!) {
  user(login: $login) {
    createdAt
  }
}
"#;

const CALENDAR_QUERY: &str = r#"
query($login: String!, $from: DateTime!, $to: DateTime!) {
  user(login: $login) {
    contributionsCollection(from: $from, to: $to) {
      contributionCalendar {
        weeks {
          contributionDays {
            date
            contributionCount
          }
        }
      }
    }
  }
}
"#;

/// Run a GraphQL query and return its `data` object.
fn graphql(
    api: &dyn GitHubApi,
    login: &str,
    query: &str,
    variables: Value,
) -> Result<Value, MirrorError> {
    let response = api
        .post(
            GRAPHQL_ROUTE,
            &json!({ "query": query, "variables": variables }),
        )?
        .into_success()?;
    if let Some(errors) = response.body.get("errors").and_then(|e| e.as_array()) {
        if errors
            .iter()
            .any(|e| e.get("type").and_then(|t| t.as_str()) == Some("NOT_FOUND"))
        {
            return Err(MirrorError::AccountNotFound(login.to_string()));
        }
        if !errors.is_empty() {
            return Err(MirrorError::Query(Value::Array(errors.clone()).to_string()));
        }
    }
    response
        .body
        .get("data")
        .cloned()
        .ok_or_else(|| MirrorError::Query("response carried no data".into()))
}

fn user_object<'a>(data: &'a Value, login: &str) -> Result<&'a Value, MirrorError> {
    match data.get("user") {
        Some(user) if !user.is_null() => Ok(user),
        _ => Err(MirrorError::AccountNotFound(login.to_string())),
    }
}

/// Creation date of `login`, used as the backfill start.
pub fn fetch_user_created_at(api: &dyn GitHubApi, login: &str) -> Result<NaiveDate, MirrorError> {
    let data = graphql(api, login, CREATED_AT_QUERY, json!({ "login": login }))?;
    let created_at = user_object(&data, login)?
        .get("createdAt")
        .and_then(|v| v.as_str())
        .ok_or_else(|| MirrorError::Query("user.createdAt missing".into()))?;
    let day = created_at
        .get(..10)
        .ok_or_else(|| MirrorError::Query(format!("malformed createdAt '{}'", created_at)))?;
    NaiveDate::parse_from_str(day, "%Y-%m-%d")
        .map_err(|e| MirrorError::Query(format!("malformed createdAt '{}': {}", created_at, e)))
}

/// Query one window (at most `MAX_WINDOW_DAYS` long). Zero-count days are dropped.
pub fn fetch_window(
    api: &dyn GitHubApi,
    login: &str,
    window: DateRange,
) -> Result<ContributionMap, MirrorError> {
    let variables = json!({
        "login": login,
        "from": format!("{}T00:00:00Z", window.start().format("%Y-%m-%d")),
        "to": format!("{}T23:59:59Z", window.end().format("%Y-%m-%d")),
    });
    let data = graphql(api, login, CALENDAR_QUERY, variables)?;
    let weeks = user_object(&data, login)?
        .pointer("/contributionsCollection/contributionCalendar/weeks")
        .and_then(|w| w.as_array())
        .ok_or_else(|| MirrorError::Query("contribution calendar missing".into()))?;

    let mut result = ContributionMap::new();
    for week in weeks {
        let days = week
            .get("contributionDays")
            .and_then(|d| d.as_array())
            .map(Vec::as_slice)
            .unwrap_or_default();
        for day in days {
            let date = day
                .get("date")
                .and_then(|d| d.as_str())
                .ok_or_else(|| MirrorError::Query("contribution day without date".into()))?;
            let count = day
                .get("contributionCount")
                .and_then(|c| c.as_u64())
                .unwrap_or(0);
            if count == 0 {
                continue;
            }
            let date = NaiveDate::parse_from_str(date, "%Y-%m-%d")
                .map_err(|e| MirrorError::Query(format!("bad date '{}': {}", date, e)))?;
            // Calendar weeks can spill past the requested bounds.
            if !window.contains(date) {
                continue;
            }
            let count = u32::try_from(count).unwrap_or(u32::MAX);
            result.insert(date, count);
        }
    }
    Ok(result)
}

/// Fetch the whole range, one window at a time in chronological order.
///
/// Any failing window aborts the fetch; partial maps are never returned.
pub fn fetch_contributions(
    api: &dyn GitHubApi,
    login: &str,
    range: DateRange,
) -> Result<ContributionMap, MirrorError> {
    let mut merged = ContributionMap::new();
    for window in range.windows(MAX_WINDOW_DAYS) {
        log::debug!(
            "Querying contributions {} .. {}",
            window.start(),
            window.end()
        );
        merged.extend(fetch_window(api, login, window)?);
    }
    Ok(merged)
}
