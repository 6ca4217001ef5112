//! Version-control backend boundary for gitgraph.
//!
//! The commit-graph core never talks to a repository directly. It consumes
//! the [`Backend`] capability defined here: resolving refs to commit ids,
//! listing branches, walking ancestry from a set of starting commits and
//! reading per-branch upstream configuration.
//!
//! Two implementations are provided. [`MemoryBackend`] keeps a whole
//! repository in memory and can be rewritten while another thread polls it;
//! [`CliBackend`] shells out to the `git` executable.
//!
//! The [`lock`] module provides the per-repository read/write lock that
//! every backend call made by the graph builder is wrapped in.

mod cli;
mod error;
pub mod lock;
mod memory;
mod process;

pub use cli::CliBackend;
pub use error::BackendError;
pub use lock::{LockRegistry, RepoLock};
pub use memory::{MemoryBackend, WalkOrder};
pub use process::{GitOutput, GitProcess};

use std::path::Path;

use git_hash::CommitId;

/// Result alias for backend operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// Lazy sequence of raw commits produced by an ancestry walk.
pub type CommitIter<'a> = Box<dyn Iterator<Item = Result<RawCommit>> + 'a>;

/// Which branch namespace to list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RefKind {
    /// `refs/heads/*`
    Local,
    /// `refs/remotes/*`
    Remote,
}

impl RefKind {
    /// Ref path prefix of this namespace.
    pub fn prefix(self) -> &'static str {
        match self {
            RefKind::Local => "refs/heads/",
            RefKind::Remote => "refs/remotes/",
        }
    }
}

/// One branch as reported by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchListing {
    /// Short name, e.g. `main` or `origin/main`.
    pub name: String,
    /// Full ref path, e.g. `refs/heads/main`.
    pub ref_path: String,
    /// Commit the branch points at.
    pub head: CommitId,
}

/// A commit exactly as the backend delivers it, before it is wrapped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawCommit {
    pub id: CommitId,
    /// Parent ids in order; first parent first.
    pub parents: Vec<CommitId>,
    pub author_name: String,
    pub author_email: String,
    /// Author time, seconds since the epoch.
    pub timestamp: i64,
    /// Full commit message.
    pub message: String,
}

/// Upstream configuration of a local branch (`branch.<name>.remote/merge`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Upstream {
    pub remote: String,
    /// Ref on the remote side, e.g. `refs/heads/main`.
    pub merge_ref: String,
}

impl Upstream {
    /// Path of the remote-tracking ref this upstream corresponds to,
    /// e.g. `refs/remotes/origin/main`.
    pub fn tracking_ref_path(&self) -> String {
        let branch = self
            .merge_ref
            .strip_prefix("refs/heads/")
            .unwrap_or(&self.merge_ref);
        format!("refs/remotes/{}/{}", self.remote, branch)
    }
}

/// A tag, peeled to the commit it names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagListing {
    pub name: String,
    pub target: CommitId,
}

/// Capability the commit-graph core consumes from a version-control system.
///
/// Implementations must be safe to call from the background builder thread;
/// serialization against working-tree mutation is the caller's job (see
/// [`RepoLock`]).
pub trait Backend: Send + Sync {
    /// Directory identifying the repository. Used as the lock key.
    fn location(&self) -> &Path;

    /// Resolve a ref name (`HEAD`, `refs/heads/main`, a hex id) to a commit.
    /// Returns `None` if the name does not resolve, e.g. an unborn `HEAD`.
    fn resolve_ref(&self, name: &str) -> Result<Option<CommitId>>;

    /// The checked-out branch as a full ref path, the raw commit hex when
    /// `HEAD` is detached, or `None` if neither can be determined.
    fn current_branch(&self) -> Result<Option<String>>;

    /// All branches in one namespace, sorted by ref path.
    fn list_branches(&self, kind: RefKind) -> Result<Vec<BranchListing>>;

    /// A single walk over the ancestry of every id in `starts`.
    ///
    /// Each reachable commit is produced once. Parents are preferably
    /// delivered before their children but callers must not rely on it.
    fn walk_ancestry<'a>(&'a self, starts: &[CommitId]) -> Result<CommitIter<'a>>;

    /// Upstream configuration for a local branch (short name).
    fn branch_config(&self, branch: &str) -> Result<Option<Upstream>>;

    /// All tags, peeled to commits.
    fn list_tags(&self) -> Result<Vec<TagListing>>;
}
