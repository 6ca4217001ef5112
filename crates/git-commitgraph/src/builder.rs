//! Multi-start ancestry walks feeding the registry.

use std::collections::HashSet;
use std::sync::Arc;

use git_backend::{Backend, RepoLock};
use git_hash::CommitId;
use tracing::{debug, info, warn};

use crate::branches::BranchModel;
use crate::node::CommitNode;
use crate::registry::CommitRegistry;
use crate::Result;

/// Tuning for [`GraphBuilder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildOptions {
    /// Upper bound on relink passes after the walk. Parents still missing
    /// afterwards are reported as dangling.
    pub max_link_passes: usize,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self { max_link_passes: 3 }
    }
}

/// A parent link that could not be resolved within one build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DanglingEdge {
    pub child: CommitId,
    pub parent: CommitId,
}

/// Result of one build: the complete reachable set from its starts.
#[derive(Debug, Default)]
pub struct BuildOutcome {
    /// Reachable nodes, each once, in the order the backend delivered them.
    pub nodes: Vec<Arc<CommitNode>>,
    pub dangling: Vec<DanglingEdge>,
}

impl BuildOutcome {
    pub fn ids(&self) -> HashSet<CommitId> {
        self.nodes.iter().map(|n| n.id()).collect()
    }

    pub fn contains(&self, id: &CommitId) -> bool {
        self.nodes.iter().any(|n| n.id() == *id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Walks backend history and wraps it into a [`CommitRegistry`].
///
/// Every backend call runs under the repository's read lock.
pub struct GraphBuilder<'a> {
    backend: &'a dyn Backend,
    lock: &'a RepoLock,
    registry: &'a CommitRegistry,
    options: BuildOptions,
}

impl<'a> GraphBuilder<'a> {
    pub fn new(backend: &'a dyn Backend, lock: &'a RepoLock, registry: &'a CommitRegistry) -> Self {
        Self {
            backend,
            lock,
            registry,
            options: BuildOptions::default(),
        }
    }

    pub fn with_options(mut self, options: BuildOptions) -> Self {
        self.options = options;
        self
    }

    /// Wrap everything reachable from `starts` using one backend walk.
    ///
    /// Commits are wrapped and linked in delivery order; a parent delivered
    /// after its child is attached when it is registered. Nodes already in
    /// the registry are reused, never duplicated.
    pub fn build_from(&self, starts: &[CommitId]) -> Result<BuildOutcome> {
        let mut seen = HashSet::new();
        let starts: Vec<CommitId> = starts.iter().copied().filter(|id| seen.insert(*id)).collect();
        if starts.is_empty() {
            return Ok(BuildOutcome::default());
        }

        let mut nodes = Vec::new();
        let mut delivered = HashSet::new();
        self.lock.read(|| -> Result<()> {
            for raw in self.backend.walk_ancestry(&starts)? {
                let raw = raw?;
                if !delivered.insert(raw.id) {
                    continue;
                }
                let node = self.registry.wrap(raw)?;
                self.registry.link_parents(&node);
                nodes.push(node);
            }
            Ok(())
        })?;

        let dangling = self.relink(&nodes);
        info!(
            starts = starts.len(),
            nodes = nodes.len(),
            dangling = dangling.len(),
            registry = self.registry.len(),
            "build finished"
        );
        Ok(BuildOutcome { nodes, dangling })
    }

    /// Bounded passes over nodes that still miss a parent. Never loops on a
    /// parent the backend will not supply.
    fn relink(&self, nodes: &[Arc<CommitNode>]) -> Vec<DanglingEdge> {
        let mut unresolved: Vec<&Arc<CommitNode>> =
            nodes.iter().filter(|n| !n.is_linked()).collect();
        for pass in 0..self.options.max_link_passes {
            if unresolved.is_empty() {
                break;
            }
            let before = unresolved.len();
            unresolved.retain(|node| self.registry.link_parents(node) > 0);
            debug!(pass, before, after = unresolved.len(), "relink pass");
            if unresolved.len() == before {
                break;
            }
        }

        let mut dangling = Vec::new();
        for node in unresolved {
            for parent in node.unlinked_parents() {
                warn!(
                    child = %node.id(),
                    parent = %parent,
                    "parent commit is missing from the backend"
                );
                dangling.push(DanglingEdge {
                    child: node.id(),
                    parent,
                });
            }
        }
        dangling
    }

    /// Build from `HEAD` plus every local branch head.
    pub fn build_local(&self, branches: &BranchModel) -> Result<BuildOutcome> {
        let mut starts = Vec::new();
        if let Some(head) = self.lock.read(|| self.backend.resolve_ref("HEAD"))? {
            starts.push(head);
        }
        starts.extend(branches.local_branches().iter().map(|b| b.head));
        self.build_from(&starts)
    }

    /// Build from every remote branch head.
    pub fn build_remote(&self, branches: &BranchModel) -> Result<BuildOutcome> {
        let starts: Vec<_> = branches.remote_branches().iter().map(|b| b.head).collect();
        self.build_from(&starts)
    }

    /// Append tags onto registered commits. Tags naming commits that are
    /// not registered are skipped. Returns how many tags were added.
    pub fn refresh_tags(&self) -> Result<usize> {
        let tags = self.lock.read(|| self.backend.list_tags())?;
        let added = tags
            .iter()
            .filter(|tag| self.registry.add_tag(&tag.target, &tag.name))
            .count();
        if added > 0 {
            debug!(added, "tags attached");
        }
        Ok(added)
    }
}
