//! Commit graph core: a deduplicated registry of commit nodes, the builder
//! that fills it from backend ancestry walks, and the branch model that
//! classifies commits and branches by locality.
//!
//! Nodes are owned by the [`CommitRegistry`] and shared as `Arc`s; every
//! other structure refers to commits by [`CommitId`] and looks them up.

mod branch;
mod branches;
mod builder;
mod locality;
mod node;
mod registry;

pub use branch::{BranchKind, BranchRef};
pub use branches::BranchModel;
pub use builder::{BuildOptions, BuildOutcome, DanglingEdge, GraphBuilder};
pub use locality::{Locality, Reachability};
pub use node::CommitNode;
pub use registry::CommitRegistry;

pub use git_hash::CommitId;

/// Errors produced while building the commit graph.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error(transparent)]
    Backend(#[from] git_backend::BackendError),

    #[error("raw commit has no id")]
    MissingId,
}

pub type Result<T> = std::result::Result<T, GraphError>;
