use std::process::ExitStatus;

use git_hash::CommitId;

/// Errors reported by a version-control backend.
///
/// These are the only failures expected to abort a build pass; callers
/// retry on the next poll cycle.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("failed to run {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{command} exited with {status}: {stderr}")]
    CommandFailed {
        command: String,
        status: ExitStatus,
        stderr: String,
    },

    #[error("unexpected backend output: {0}")]
    Parse(String),

    #[error("commit not found: {0}")]
    UnknownCommit(CommitId),

    #[error(transparent)]
    Hash(#[from] git_hash::HashError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
