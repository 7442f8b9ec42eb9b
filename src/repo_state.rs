use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{json, Value};
use tempfile::TempDir;

use crate::error::MirrorError;
use crate::git::{self, run_git, ORIGIN};
use crate::github::GitHubApi;
use crate::model::RepoState;

pub const COMMITTER_NAME: &str = "copiar";
pub const COMMITTER_EMAIL: &str = "copiar@users.noreply.github.com";
pub const DEFAULT_BRANCH: &str = "main";
pub const REPO_DESCRIPTION: &str = "GitHub contribution mirror";

/// The destination repository: where it lives on GitHub and how git reaches it.
#[derive(Debug, Clone)]
pub struct RepoTarget {
    pub owner: String,
    pub name: String,
    pub remote_url: String,
}

impl RepoTarget {
    /// Target on github.com, authenticated by embedding `token` in the remote URL.
    pub fn github(owner: &str, name: &str, token: &str) -> Self {
        Self {
            owner: owner.to_string(),
            name: name.to_string(),
            remote_url: format!("https://{}@github.com/{}/{}.git", token, owner, name),
        }
    }

    fn route(&self) -> String {
        format!("/repos/{}/{}", self.owner, self.name)
    }
}

/// The fields of the repository resource that hint at existing history.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RepoMetadata {
    pub size: u64,
    pub default_branch: Option<String>,
    pub pushed_at: Option<String>,
}

impl RepoMetadata {
    pub fn from_json(body: &Value) -> Self {
        let text = |key: &str| body.get(key).and_then(|v| v.as_str()).map(str::to_string);
        Self {
            size: body.get("size").and_then(|v| v.as_u64()).unwrap_or(0),
            default_branch: text("default_branch"),
            pushed_at: text("pushed_at"),
        }
    }

    /// Fast guess only; `resolve_repo_state` confirms a negative answer.
    pub fn suggests_history(&self) -> bool {
        self.size > 0 || (self.default_branch.is_some() && self.pushed_at.is_some())
    }
}

/// `None` when the repository does not exist.
pub fn fetch_repo_metadata(
    api: &dyn GitHubApi,
    target: &RepoTarget,
) -> Result<Option<RepoMetadata>, MirrorError> {
    let response = api.get(&target.route(), &[])?;
    if response.status == 404 {
        return Ok(None);
    }
    let response = response.into_success()?;
    Ok(Some(RepoMetadata::from_json(&response.body)))
}

/// Authoritative history check against the commit listing.
///
/// GitHub answers 409 for an empty repository; 404 is treated the same way.
pub fn remote_has_commits(api: &dyn GitHubApi, target: &RepoTarget) -> Result<bool, MirrorError> {
    let response = api.get(&format!("{}/commits", target.route()), &[("per_page", "1")])?;
    if response.status == 409 || response.status == 404 {
        return Ok(false);
    }
    let response = response.into_success()?;
    Ok(response
        .body
        .as_array()
        .map(|commits| !commits.is_empty())
        .unwrap_or(false))
}

/// Decide what the destination currently looks like.
///
/// The metadata heuristic and the commit listing are OR-ed: the listing is
/// only consulted when the heuristic says "empty".
pub fn resolve_repo_state(
    api: &dyn GitHubApi,
    target: &RepoTarget,
) -> Result<RepoState, MirrorError> {
    let metadata = match fetch_repo_metadata(api, target)? {
        Some(m) => m,
        None => return Ok(RepoState::Absent),
    };
    log::debug!("Repository metadata: {:?}", metadata);
    if metadata.suggests_history() || remote_has_commits(api, target)? {
        Ok(RepoState::ExistsWithHistory)
    } else {
        Ok(RepoState::ExistsEmpty)
    }
}

/// Create the destination as a private, uninitialised repository.
pub fn create_repo(api: &dyn GitHubApi, target: &RepoTarget) -> Result<(), MirrorError> {
    let response = api.post(
        "/user/repos",
        &json!({
            "name": target.name,
            "private": true,
            "description": REPO_DESCRIPTION,
            "auto_init": false,
        }),
    )?;
    if response.status == 422 {
        return Err(MirrorError::NameConflict(target.name.clone()));
    }
    response.into_success()?;
    log::info!("Created private repository '{}/{}'", target.owner, target.name);
    Ok(())
}

/// Resolve the state and create the repository if it is absent.
///
/// The returned state is the one observed before creation, so `Absent`
/// means "now exists, without history".
pub fn ensure_repo(api: &dyn GitHubApi, target: &RepoTarget) -> Result<RepoState, MirrorError> {
    let state = resolve_repo_state(api, target)?;
    if state == RepoState::Absent {
        create_repo(api, target)?;
    }
    Ok(state)
}

/// How a working copy came to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preparation {
    Reused,
    Cloned,
    Initialized,
}

enum Scratch {
    /// Caller-supplied directory; never removed.
    Persistent,
    /// Removed when dropped or disposed.
    Temporary(TempDir),
    /// Temporary location the caller asked to keep.
    Retained,
}

/// Local git repository the run stages commits in.
pub struct WorkingCopy {
    path: PathBuf,
    preparation: Preparation,
    scratch: Scratch,
}

impl WorkingCopy {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn preparation(&self) -> Preparation {
        self.preparation
    }

    /// True if the directory was created for this run.
    pub fn is_transient(&self) -> bool {
        !matches!(self.scratch, Scratch::Persistent)
    }

    /// End of run: delete a temporary copy, or report where a retained one lives.
    pub fn dispose(self) {
        match self.scratch {
            Scratch::Persistent => {}
            Scratch::Temporary(dir) => {
                if let Err(e) = dir.close() {
                    log::warn!("Failed to remove '{}': {}", self.path.display(), e);
                }
            }
            Scratch::Retained => log::info!("Kept repo at: {}", self.path.display()),
        }
    }
}

/// Set the fixed committer identity on a working copy.
pub fn configure_identity(dir: &Path) -> Result<(), MirrorError> {
    run_git(dir, &["config", "user.name", COMMITTER_NAME])?;
    run_git(dir, &["config", "user.email", COMMITTER_EMAIL])?;
    Ok(())
}

/// Produce a ready working copy for `state`.
///
/// * `local_dir` already a repository: reuse it, rebasing onto the remote
///   branch first when the remote has history.
/// * otherwise clone when the remote has history, or init `main` and add
///   `origin` when it does not.
///
/// Without `local_dir` a temporary directory is used, kept afterwards only
/// if `keep` is set.
pub fn prepare_working_copy(
    local_dir: Option<&Path>,
    remote_url: &str,
    state: RepoState,
    keep: bool,
) -> Result<WorkingCopy, MirrorError> {
    match local_dir {
        Some(dir) => prepare_local_copy(dir, remote_url, state),
        None => prepare_temporary_copy(&std::env::temp_dir(), remote_url, state, keep),
    }
}

fn prepare_local_copy(
    dir: &Path,
    remote_url: &str,
    state: RepoState,
) -> Result<WorkingCopy, MirrorError> {
    fs::create_dir_all(dir)?;
    let preparation = if git::is_work_tree(dir) {
        // Rebasing needs an identity.
        configure_identity(dir)?;
        if state.has_history() {
            sync_with_remote(dir)?;
        }
        Preparation::Reused
    } else {
        populate(dir, remote_url, state)?
    };
    Ok(WorkingCopy {
        path: dir.to_path_buf(),
        preparation,
        scratch: Scratch::Persistent,
    })
}

/// Working copy in a fresh `copiar-*` directory under `base`.
///
/// If cloning or initialising fails the directory is removed, even when
/// `keep` is set.
pub fn prepare_temporary_copy(
    base: &Path,
    remote_url: &str,
    state: RepoState,
    keep: bool,
) -> Result<WorkingCopy, MirrorError> {
    let tmp = tempfile::Builder::new().prefix("copiar-").tempdir_in(base)?;
    let preparation = populate(tmp.path(), remote_url, state)?;
    let (path, scratch) = if keep {
        (tmp.into_path(), Scratch::Retained)
    } else {
        (tmp.path().to_path_buf(), Scratch::Temporary(tmp))
    };
    Ok(WorkingCopy {
        path,
        preparation,
        scratch,
    })
}

/// Clone or init into `path`, then set the identity.
fn populate(path: &Path, remote_url: &str, state: RepoState) -> Result<Preparation, MirrorError> {
    let preparation = if state.has_history() {
        log::info!("Cloning mirror repository into '{}'", path.display());
        run_git(path, &["clone", remote_url, "."])?;
        Preparation::Cloned
    } else {
        log::info!("Initializing empty mirror repository in '{}'", path.display());
        run_git(path, &["init", "-b", DEFAULT_BRANCH])?;
        run_git(path, &["remote", "add", ORIGIN, remote_url])?;
        Preparation::Initialized
    };
    configure_identity(path)?;
    Ok(preparation)
}

/// Fetch the remote branch and replay local-only commits on top of it.
///
/// Replayed commits keep their committer date equal to their author date,
/// so they stay counted under the day they were made for.
fn sync_with_remote(dir: &Path) -> Result<(), MirrorError> {
    let branch = git::head_branch(dir)?;
    log::info!("Pulling latest '{}' into '{}'", branch, dir.display());
    run_git(dir, &["fetch", ORIGIN, &branch])?;
    if git::has_head(dir)? {
        run_git(
            dir,
            &["rebase", "--committer-date-is-author-date", "FETCH_HEAD"],
        )?;
    } else {
        run_git(dir, &["reset", "--hard", "FETCH_HEAD"])?;
    }
    Ok(())
}
