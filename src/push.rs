use std::path::Path;

use crate::error::MirrorError;
use crate::git::run_git;

pub fn current_branch(dir: &Path) -> Result<String, MirrorError> {
    Ok(run_git(dir, &["rev-parse", "--abbrev-ref", "HEAD"])?
        .trim()
        .to_string())
}

/// Push the current branch to `remote`. Never forces; a rejected push is an error.
pub fn push_to_remote(dir: &Path, remote: &str) -> Result<(), MirrorError> {
    let branch = current_branch(dir)?;
    log::info!("Pushing '{}' to '{}'...", branch, remote);
    run_git(dir, &["push", remote, &branch])?;
    Ok(())
}
