//! The canonical set of wrapped commits for one repository.

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use git_backend::RawCommit;
use git_hash::CommitId;
use parking_lot::Mutex;
use tracing::debug;

use crate::node::CommitNode;
use crate::{GraphError, Result};

/// Deduplicated, append-only store of [`CommitNode`]s keyed by id.
///
/// Parent links are attached as soon as both ends are registered. A link
/// to a parent that is not registered yet is parked in the pending queue
/// under the missing parent's id and attached when that parent arrives.
///
/// Lock order is pending queue, then map shard, then node link state.
/// Enqueueing a missing parent and registering a node both hold the
/// pending mutex, so a link cannot slip between the check and the park.
#[derive(Debug, Default)]
pub struct CommitRegistry {
    nodes: DashMap<CommitId, Arc<CommitNode>>,
    /// missing parent -> children waiting for it
    pending: Mutex<HashMap<CommitId, Vec<CommitId>>>,
}

impl CommitRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `raw`, or return the node already registered for its id.
    ///
    /// The returned node has no parent links yet if it is new; see
    /// [`link_parents`](Self::link_parents).
    pub fn wrap(&self, raw: RawCommit) -> Result<Arc<CommitNode>> {
        if raw.id.is_null() {
            return Err(GraphError::MissingId);
        }
        if let Some(existing) = self.get(&raw.id) {
            return Ok(existing);
        }

        let mut pending = self.pending.lock();
        let id = raw.id;
        let node = match self.nodes.entry(id) {
            Entry::Occupied(entry) => return Ok(Arc::clone(entry.get())),
            Entry::Vacant(entry) => {
                let node = Arc::new(CommitNode::from_raw(raw));
                Arc::clone(entry.insert(node).value())
            }
        };
        self.drain(&mut pending, &node);
        Ok(node)
    }

    /// Attach every recorded parent of `node` that is registered and park
    /// the rest. Returns how many parents are still missing.
    pub fn link_parents(&self, node: &CommitNode) -> usize {
        let mut pending = self.pending.lock();
        self.link_locked(&mut pending, node)
    }

    fn link_locked(
        &self,
        pending: &mut HashMap<CommitId, Vec<CommitId>>,
        node: &CommitNode,
    ) -> usize {
        let mut missing = 0;
        for parent_id in node.unlinked_parents() {
            match self.get(&parent_id) {
                Some(parent) => {
                    if node.attach_parent(parent_id) {
                        parent.attach_child(node.id());
                    }
                }
                None => {
                    missing += 1;
                    let waiting = pending.entry(parent_id).or_default();
                    if !waiting.contains(&node.id()) {
                        debug!(
                            child = %node.id().short(),
                            parent = %parent_id.short(),
                            "parent not registered yet"
                        );
                        waiting.push(node.id());
                    }
                }
            }
        }
        missing
    }

    /// Attach children that were waiting for `parent`.
    ///
    /// A waiting child gets all of its now-registered parents relinked, not
    /// only `parent`, so a link missed under another id is picked up here.
    fn drain(&self, pending: &mut HashMap<CommitId, Vec<CommitId>>, parent: &CommitNode) {
        let mut worklist = match pending.remove(&parent.id()) {
            Some(waiting) => waiting,
            None => return,
        };
        debug!(parent = %parent.id().short(), waiting = worklist.len(), "resolving parked links");
        while let Some(child_id) = worklist.pop() {
            if let Some(child) = self.get(&child_id) {
                self.link_locked(pending, &child);
            }
        }
    }

    pub fn get(&self, id: &CommitId) -> Option<Arc<CommitNode>> {
        self.nodes.get(id).map(|entry| Arc::clone(entry.value()))
    }

    pub fn contains(&self, id: &CommitId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of parked (child, missing parent) links.
    pub fn pending_count(&self) -> usize {
        self.pending.lock().values().map(Vec::len).sum()
    }

    /// Parent ids that some registered node is waiting for.
    pub fn pending_parents(&self) -> Vec<CommitId> {
        let mut parents: Vec<_> = self.pending.lock().keys().copied().collect();
        parents.sort();
        parents
    }

    /// Append a tag name to a registered commit. Returns `false` if the
    /// commit is unknown or already carries the tag.
    pub fn add_tag(&self, id: &CommitId, name: &str) -> bool {
        match self.get(id) {
            Some(node) => node.add_tag(name),
            None => false,
        }
    }

    /// Snapshot of every registered node, in no particular order.
    pub fn nodes(&self) -> Vec<Arc<CommitNode>> {
        self.nodes.iter().map(|entry| Arc::clone(entry.value())).collect()
    }
}
