use thiserror::Error;

/// Every condition that stops a mirror run.
///
/// Recoverable situations (repository absent, working copy not yet
/// initialised, day already mirrored) are handled where they occur and never
/// show up here.
#[derive(Debug, Error)]
pub enum MirrorError {
    #[error("GitHub API returned 401. Check that your token has 'repo' and 'read:user' scopes.")]
    Auth,

    #[error("GitHub user '{0}' not found.")]
    AccountNotFound(String),

    #[error("repo name conflict creating '{0}'")]
    NameConflict(String),

    #[error("GitHub API returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("GraphQL errors: {0}")]
    Query(String),

    #[error("{command} failed:\n{stderr}")]
    Git { command: String, stderr: String },

    #[error("GitHub request timed out after {0} seconds")]
    Timeout(u64),

    #[error("{0}")]
    Config(String),

    #[error("interrupted")]
    Interrupted,

    #[error(transparent)]
    Repo(#[from] git2::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    GitHub(#[from] octocrab::Error),
}
