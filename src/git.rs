use std::path::Path;
use std::process::Command;

use git2::{ErrorCode, Repository};

use crate::error::MirrorError;

/// Remote every working copy publishes to.
pub const ORIGIN: &str = "origin";

/// Check if Git is installed.
pub fn check_git_installed() -> bool {
    if let Ok(output) = Command::new("git").arg("--version").output() {
        output.status.success()
    } else {
        false
    }
}

/// Run `git -C <dir> <args>`; non-zero exit becomes `MirrorError::Git` with stderr attached.
pub fn run_git(dir: &Path, args: &[&str]) -> Result<String, MirrorError> {
    run_git_with_env(dir, args, &[])
}

/// Like `run_git`, with extra environment variables for the child only.
pub fn run_git_with_env(
    dir: &Path,
    args: &[&str],
    env: &[(&str, &str)],
) -> Result<String, MirrorError> {
    let mut cmd = Command::new("git");
    cmd.arg("-C").arg(dir).args(args);
    // A rejected credential must fail, not block on a password prompt.
    cmd.env("GIT_TERMINAL_PROMPT", "0");
    for (key, value) in env {
        cmd.env(key, value);
    }
    let output = cmd.output()?;
    if !output.status.success() {
        let command = redact_credentials(&format!("git {}", args.join(" ")));
        let stderr = redact_credentials(String::from_utf8_lossy(&output.stderr).trim_end());
        log::debug!("{} exited with {}", command, output.status);
        return Err(MirrorError::Git { command, stderr });
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Replace the userinfo part of any `scheme://user@host` URL with `***`.
pub fn redact_credentials(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(idx) = rest.find("://") {
        let (head, tail) = rest.split_at(idx + 3);
        out.push_str(head);
        let authority_end = tail
            .find(|c: char| c == '/' || c.is_whitespace())
            .unwrap_or(tail.len());
        match tail[..authority_end].rfind('@') {
            Some(at) => {
                out.push_str("***");
                rest = &tail[at..];
            }
            None => rest = tail,
        }
    }
    out.push_str(rest);
    out
}

/// True if `dir` itself is the root of a non-bare git repository.
///
/// Parent directories are not searched.
pub fn is_work_tree(dir: &Path) -> bool {
    match Repository::open(dir) {
        Ok(repo) => !repo.is_bare(),
        Err(_) => false,
    }
}

/// True if HEAD resolves to a commit. An unborn branch has no history.
pub fn has_head(dir: &Path) -> Result<bool, MirrorError> {
    let repo = Repository::open(dir)?;
    let result = match repo.head() {
        Ok(_) => Ok(true),
        Err(e) if e.code() == ErrorCode::UnbornBranch || e.code() == ErrorCode::NotFound => {
            Ok(false)
        }
        Err(e) => Err(e.into()),
    };
    result
}

/// Branch HEAD points at, also for an unborn branch.
pub fn head_branch(dir: &Path) -> Result<String, MirrorError> {
    let repo = Repository::open(dir)?;
    let head = repo.find_reference("HEAD")?;
    match head.symbolic_target() {
        Some(target) => Ok(target
            .strip_prefix("refs/heads/")
            .unwrap_or(target)
            .to_string()),
        None => Err(git2::Error::from_str("HEAD is detached; check out a branch first").into()),
    }
}
