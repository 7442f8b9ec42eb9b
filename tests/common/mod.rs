#![allow(dead_code)]

use std::cell::RefCell;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use copiar::*;
use git2::{Repository, RepositoryInitOptions};
use serde_json::{json, Value};

type Responder = Box<dyn Fn(&str, &str, &Value) -> ApiResponse>;

/// In-memory `GitHubApi`: records every call and answers through a closure
/// taking `(method, route, body_or_query)`.
pub struct FakeGitHub {
    responder: Responder,
    pub calls: RefCell<Vec<(String, String, Value)>>,
}

impl FakeGitHub {
    pub fn new(responder: impl Fn(&str, &str, &Value) -> ApiResponse + 'static) -> Self {
        Self {
            responder: Box::new(responder),
            calls: RefCell::new(Vec::new()),
        }
    }

    pub fn routes(&self) -> Vec<String> {
        self.calls
            .borrow()
            .iter()
            .map(|(m, r, _)| format!("{} {}", m, r))
            .collect()
    }

    /// Variables of every GraphQL call, in order.
    pub fn graphql_variables(&self) -> Vec<Value> {
        self.calls
            .borrow()
            .iter()
            .filter(|(m, r, _)| m == "POST" && r == "/graphql")
            .map(|(_, _, body)| body["variables"].clone())
            .collect()
    }
}

impl GitHubApi for FakeGitHub {
    fn get(&self, route: &str, query: &[(&str, &str)]) -> Result<ApiResponse, MirrorError> {
        let query: serde_json::Map<String, Value> = query
            .iter()
            .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
            .collect();
        let query = Value::Object(query);
        self.calls
            .borrow_mut()
            .push(("GET".into(), route.into(), query.clone()));
        Ok((self.responder)("GET", route, &query))
    }

    fn post(&self, route: &str, body: &Value) -> Result<ApiResponse, MirrorError> {
        self.calls
            .borrow_mut()
            .push(("POST".into(), route.into(), body.clone()));
        Ok((self.responder)("POST", route, body))
    }
}

pub fn d(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

pub fn map(entries: &[(&str, u32)]) -> ContributionMap {
    entries.iter().map(|&(day, n)| (d(day), n)).collect()
}

/// GraphQL calendar answer for the days of `source` inside the `from`/`to`
/// variables of `body`, padded with a zero-count day.
pub fn calendar_response(source: &ContributionMap, body: &Value) -> ApiResponse {
    let from = d(&body["variables"]["from"].as_str().unwrap()[..10]);
    let to = d(&body["variables"]["to"].as_str().unwrap()[..10]);
    let mut days: Vec<Value> = source
        .range(from..=to)
        .map(|(day, n)| json!({"date": day.format("%Y-%m-%d").to_string(), "contributionCount": n}))
        .collect();
    days.push(json!({"date": from.format("%Y-%m-%d").to_string(), "contributionCount": 0}));
    ApiResponse::new(
        200,
        json!({"data": {"user": {"contributionsCollection": {"contributionCalendar": {
            "weeks": [{"contributionDays": days}]
        }}}}}),
    )
}

/// Bare repository whose HEAD points at `main`, like a GitHub remote.
pub fn init_bare(path: &Path) -> Repository {
    let mut opts = RepositoryInitOptions::new();
    opts.bare(true).initial_head("main");
    Repository::init_opts(path, &opts).unwrap()
}

pub fn bare_has_commits(path: &Path) -> bool {
    Repository::open_bare(path)
        .map(|r| r.head().is_ok())
        .unwrap_or(false)
}

/// Commit count reachable from HEAD of `path` (bare or not).
pub fn commit_count(path: &Path) -> usize {
    let repo = Repository::open(path).unwrap();
    if repo.head().is_err() {
        return 0;
    }
    let mut walk = repo.revwalk().unwrap();
    walk.push_head().unwrap();
    walk.count()
}

/// Push `commits` to the bare at `bare` through a scratch working copy.
pub fn seed_remote(bare: &Path, scratch: &Path, commits: &ContributionMap) {
    let wc = prepare_working_copy(
        Some(scratch),
        bare.to_str().unwrap(),
        RepoState::ExistsEmpty,
        false,
    )
    .unwrap();
    emit_commits(wc.path(), commits, &Interrupt::default()).unwrap();
    push_to_remote(wc.path(), "origin").unwrap();
}

pub fn bare_target(bare: &Path) -> RepoTarget {
    RepoTarget {
        owner: "me".into(),
        name: "mirror".into(),
        remote_url: bare.to_str().unwrap().to_string(),
    }
}

/// Fake GitHub for full runs: `source` is the work account's calendar and the
/// mirror repository is the bare at `bare`.
pub fn fake_for_bare(source: ContributionMap, bare: PathBuf) -> FakeGitHub {
    FakeGitHub::new(move |method, route, body| match (method, route) {
        ("POST", "/graphql") => calendar_response(&source, body),
        ("GET", "/repos/me/mirror") => ApiResponse::new(
            200,
            json!({"size": 0, "default_branch": null, "pushed_at": null}),
        ),
        ("GET", "/repos/me/mirror/commits") => {
            if bare_has_commits(&bare) {
                ApiResponse::new(200, json!([{"sha": "abc"}]))
            } else {
                ApiResponse::new(409, json!({"message": "Git Repository is empty."}))
            }
        }
        _ => ApiResponse::new(500, json!({"message": format!("unexpected {} {}", method, route)})),
    })
}

pub fn config(start: &str, end: &str) -> Config {
    Config {
        personal_token: "tok".into(),
        work_username: "worker".into(),
        personal_username: "me".into(),
        target_repo: "mirror".into(),
        start_date: d(start),
        end_date: d(end),
        start_from_cli: true,
        local_dir: None,
        dry_run: false,
        yes: true,
        keep_repo: false,
        backfill: false,
    }
}
