//! Commit identity for the gitgraph commit-graph core.
//!
//! `CommitId` is the deduplication key used by every other crate in the
//! workspace: the registry, the branch model and the tree model all refer to
//! commits by id and never hold owning copies of each other's data.

mod error;
mod hex;
mod id;

pub use error::HashError;
pub use id::CommitId;
