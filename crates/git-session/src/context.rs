//! Everything the graph view needs for one repository.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use git_backend::{Backend, RepoLock};
use git_commitgraph::{
    BranchModel, BranchRef, BuildOptions, CommitNode, CommitRegistry, GraphBuilder, Locality,
    Reachability,
};
use git_hash::CommitId;
use git_treemodel::{Cell, CellChange, CellSpec, TreeModel};
use parking_lot::Mutex;
use tracing::{debug, info};

use crate::config::GraphConfig;
use crate::Result;

/// Per-repository state: backend, lock, registry, branches, reachability
/// and the tree model, owned together and passed around explicitly.
pub struct RepoContext {
    backend: Arc<dyn Backend>,
    lock: Arc<RepoLock>,
    registry: CommitRegistry,
    branches: BranchModel,
    reachability: Reachability,
    tree: TreeModel,
    config: GraphConfig,
    refreshing: Mutex<()>,
}

impl RepoContext {
    pub fn new(backend: Arc<dyn Backend>, lock: Arc<RepoLock>, config: GraphConfig) -> Self {
        let branches = BranchModel::new(Arc::clone(&backend), Arc::clone(&lock));
        Self {
            backend,
            lock,
            registry: CommitRegistry::new(),
            branches,
            reachability: Reachability::new(),
            tree: TreeModel::new(),
            config,
            refreshing: Mutex::new(()),
        }
    }

    /// Re-read branches, rebuild local and remote history, and push any new
    /// commits into the tree model.
    ///
    /// Commits reached by the shown builds become visible cells. Every other
    /// registered commit (remote-only history when remote branches are not
    /// shown, commits no branch reaches any more) is kept as an invisible
    /// placeholder. Returns whether the committed tree model changed. On
    /// error the tree model and reachability are left as they were.
    pub fn refresh_and_update(&self) -> Result<bool> {
        let _refreshing = self.refreshing.lock();

        self.branches.update_all_branches()?;
        let builder = GraphBuilder::new(self.backend.as_ref(), &self.lock, &self.registry)
            .with_options(BuildOptions {
                max_link_passes: self.config.max_link_passes,
            });
        let local = builder.build_local(&self.branches)?;
        let remote = builder.build_remote(&self.branches)?;
        builder.refresh_tags()?;

        self.reachability.set_local(local.ids());
        self.reachability.set_remote(remote.ids());

        let shown: &[Arc<CommitNode>] = if self.config.include_remote {
            &remote.nodes
        } else {
            &[]
        };
        let mut staged = 0;
        for node in parents_first(local.nodes.iter().chain(shown.iter())) {
            if self.tree.add_cell(cell_spec(&node), true) != CellChange::Unchanged {
                staged += 1;
            }
        }
        let hidden = self.place_hidden_commits();

        let changed = self.tree.update();
        if changed {
            info!(
                path = %self.location().display(),
                staged,
                hidden,
                cells = self.tree.len(),
                "graph view updated"
            );
        } else {
            debug!(path = %self.location().display(), "no graph changes");
        }
        Ok(changed)
    }

    /// Stage every registered commit the model does not hold yet as an
    /// invisible cell, oldest first.
    fn place_hidden_commits(&self) -> usize {
        let mut missing: Vec<(i64, CommitId)> = self
            .registry
            .nodes()
            .iter()
            .filter(|node| !self.tree.contains(&node.id()))
            .map(|node| (node.timestamp(), node.id()))
            .collect();
        missing.sort_unstable();
        missing
            .into_iter()
            .map(|(_, id)| self.add_invisible_commit(id))
            .sum()
    }

    /// Stage `id` and its missing ancestors as invisible cells. Only commits
    /// already in the registry can be placed. Applied by the next update.
    pub fn add_invisible_commit(&self, id: CommitId) -> usize {
        let source = |id: &CommitId| self.registry.get(id).map(|node| cell_spec(&node));
        self.tree.add_invisible_commit(id, &source)
    }

    /// Apply staged tree changes without rebuilding.
    pub fn update(&self) -> bool {
        self.tree.update()
    }

    pub fn visible_cells(&self) -> Vec<Arc<Cell>> {
        self.tree.visible_cells()
    }

    pub fn edges(&self, id: &CommitId) -> Vec<CommitId> {
        self.tree.edges(id)
    }

    pub fn classify_commit(&self, id: &CommitId) -> Option<Locality> {
        self.reachability.classify(id)
    }

    pub fn branches_with_head(&self, id: &CommitId) -> Vec<BranchRef> {
        self.branches.branches_with_head(id)
    }

    /// Branch names then tag names decorating a commit.
    pub fn ref_labels(&self, id: &CommitId) -> Vec<String> {
        let mut labels: Vec<String> = self
            .branches
            .branches_with_head(id)
            .into_iter()
            .map(|b| b.name)
            .collect();
        if let Some(node) = self.registry.get(id) {
            labels.extend(node.tags());
        }
        labels
    }

    /// Description of a registered commit.
    pub fn descriptor(&self, id: &CommitId, full: bool) -> Option<String> {
        self.registry.get(id).map(|node| node.descriptor(full))
    }

    pub fn location(&self) -> &Path {
        self.backend.location()
    }

    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.backend
    }

    pub fn lock(&self) -> &Arc<RepoLock> {
        &self.lock
    }

    pub fn tree(&self) -> &TreeModel {
        &self.tree
    }

    pub fn branches(&self) -> &BranchModel {
        &self.branches
    }

    pub fn registry(&self) -> &CommitRegistry {
        &self.registry
    }

    pub fn reachability(&self) -> &Reachability {
        &self.reachability
    }

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }
}

impl std::fmt::Debug for RepoContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepoContext")
            .field("location", &self.location())
            .field("commits", &self.registry.len())
            .field("cells", &self.tree.len())
            .finish_non_exhaustive()
    }
}

/// Label shown in a cell: author, time, full id, blank line, subject.
fn cell_spec(node: &CommitNode) -> CellSpec {
    CellSpec {
        id: node.id(),
        sort_key: node.timestamp(),
        label: format!(
            "{}\n{}\n{}\n\n{}",
            node.author_name(),
            node.formatted_when(),
            node.id(),
            node.message_short()
        ),
        parents: node.parents().to_vec(),
    }
}

/// Deduplicate and order nodes so every parent in the set precedes its
/// children. Ready nodes are taken oldest first.
fn parents_first<'a>(nodes: impl Iterator<Item = &'a Arc<CommitNode>>) -> Vec<Arc<CommitNode>> {
    let mut by_id: HashMap<CommitId, Arc<CommitNode>> = HashMap::new();
    for node in nodes {
        by_id.entry(node.id()).or_insert_with(|| Arc::clone(node));
    }

    let mut waiting: HashMap<CommitId, usize> = HashMap::new();
    let mut children: HashMap<CommitId, Vec<CommitId>> = HashMap::new();
    for node in by_id.values() {
        let in_set: HashSet<CommitId> = node
            .parents()
            .iter()
            .filter(|p| by_id.contains_key(p))
            .copied()
            .collect();
        waiting.insert(node.id(), in_set.len());
        for parent in in_set {
            children.entry(parent).or_default().push(node.id());
        }
    }

    let mut ready: BinaryHeap<Reverse<(i64, CommitId)>> = waiting
        .iter()
        .filter(|(_, count)| **count == 0)
        .map(|(id, _)| Reverse((by_id[id].timestamp(), *id)))
        .collect();

    let mut ordered = Vec::with_capacity(by_id.len());
    while let Some(Reverse((_, id))) = ready.pop() {
        for child in children.remove(&id).unwrap_or_default() {
            if let Some(count) = waiting.get_mut(&child) {
                *count -= 1;
                if *count == 0 {
                    ready.push(Reverse((by_id[&child].timestamp(), child)));
                }
            }
        }
        if let Some(node) = by_id.get(&id) {
            ordered.push(Arc::clone(node));
        }
    }
    ordered
}
