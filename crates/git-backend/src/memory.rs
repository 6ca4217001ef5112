//! In-memory repository backend.
//!
//! Holds commits, refs, `HEAD`, tags and upstream configuration in a single
//! `RwLock`-protected store so history can be rewritten through `&self`
//! while another thread is polling the backend.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};

use git_hash::CommitId;
use parking_lot::RwLock;

use crate::{
    Backend, BackendError, BranchListing, CommitIter, RawCommit, RefKind, Result, TagListing,
    Upstream,
};

/// Order in which [`MemoryBackend::walk_ancestry`] delivers commits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WalkOrder {
    /// Every parent before any of its children.
    #[default]
    ParentsFirst,
    /// Every child before its parents, so each parent link is a forward
    /// reference at the time the child is delivered.
    ChildrenFirst,
}

#[derive(Debug, Clone)]
enum Head {
    Unset,
    Symbolic(String),
    Detached(CommitId),
}

#[derive(Debug)]
struct Store {
    commits: HashMap<CommitId, RawCommit>,
    refs: BTreeMap<String, CommitId>,
    head: Head,
    upstreams: HashMap<String, Upstream>,
    next_id: u64,
    order: WalkOrder,
}

/// A repository that lives entirely in memory.
#[derive(Debug)]
pub struct MemoryBackend {
    location: PathBuf,
    store: RwLock<Store>,
}

impl MemoryBackend {
    /// Create an empty repository identified by `location`. `HEAD` points
    /// at the unborn `refs/heads/main`.
    pub fn new(location: impl Into<PathBuf>) -> Self {
        Self {
            location: location.into(),
            store: RwLock::new(Store {
                commits: HashMap::new(),
                refs: BTreeMap::new(),
                head: Head::Symbolic("refs/heads/main".into()),
                upstreams: HashMap::new(),
                next_id: 0,
                order: WalkOrder::default(),
            }),
        }
    }

    /// Set the delivery order for subsequent walks.
    pub fn set_walk_order(&self, order: WalkOrder) {
        self.store.write().order = order;
    }

    /// Insert a fully specified commit. Replaces any commit with the same id.
    pub fn insert_commit(&self, commit: RawCommit) {
        self.store.write().commits.insert(commit.id, commit);
    }

    /// Create a commit with a fresh sequential id and return that id.
    ///
    /// Parents are not required to exist; a missing parent stays dangling.
    pub fn commit(&self, parents: &[CommitId], message: &str, timestamp: i64) -> CommitId {
        let mut store = self.store.write();
        store.next_id += 1;
        let id = sequential_id(store.next_id);
        store.commits.insert(
            id,
            RawCommit {
                id,
                parents: parents.to_vec(),
                author_name: "A U Thor".into(),
                author_email: "author@example.com".into(),
                timestamp,
                message: message.to_string(),
            },
        );
        id
    }

    /// Point `ref_path` (e.g. `refs/heads/main`, `refs/remotes/origin/main`,
    /// `refs/tags/v1`) at `id`, creating the ref if needed.
    pub fn set_ref(&self, ref_path: &str, id: CommitId) {
        self.store.write().refs.insert(ref_path.to_string(), id);
    }

    /// Remove a ref. Returns whether it existed.
    pub fn delete_ref(&self, ref_path: &str) -> bool {
        self.store.write().refs.remove(ref_path).is_some()
    }

    /// Make `HEAD` a symbolic ref to `ref_path`.
    pub fn set_head(&self, ref_path: &str) {
        self.store.write().head = Head::Symbolic(ref_path.to_string());
    }

    /// Detach `HEAD` at `id`.
    pub fn detach_head(&self, id: CommitId) {
        self.store.write().head = Head::Detached(id);
    }

    /// Forget `HEAD` entirely, as if it could not be read.
    pub fn clear_head(&self) {
        self.store.write().head = Head::Unset;
    }

    /// Configure `branch.<branch>.remote` and `branch.<branch>.merge`.
    pub fn set_upstream(&self, branch: &str, remote: &str, merge_ref: &str) {
        self.store.write().upstreams.insert(
            branch.to_string(),
            Upstream {
                remote: remote.to_string(),
                merge_ref: merge_ref.to_string(),
            },
        );
    }

    /// Number of stored commits.
    pub fn commit_count(&self) -> usize {
        self.store.read().commits.len()
    }
}

/// Deterministic id for the `n`th generated commit.
fn sequential_id(n: u64) -> CommitId {
    let mut bytes = [0u8; 20];
    bytes[12..].copy_from_slice(&n.to_be_bytes());
    CommitId::Sha1(bytes)
}

impl Store {
    fn lookup(&self, name: &str) -> Option<CommitId> {
        if name == "HEAD" {
            return match &self.head {
                Head::Unset => None,
                Head::Symbolic(target) => self.refs.get(target).copied(),
                Head::Detached(id) => Some(*id),
            };
        }
        if let Some(id) = self.refs.get(name) {
            return Some(*id);
        }
        for prefix in ["refs/heads/", "refs/remotes/", "refs/tags/"] {
            if let Some(id) = self.refs.get(&format!("{prefix}{name}")) {
                return Some(*id);
            }
        }
        CommitId::from_hex(name)
            .ok()
            .filter(|id| self.commits.contains_key(id))
    }

    /// All commits reachable from `starts` in parents-first order.
    fn reachable(&self, starts: &[CommitId]) -> Result<Vec<RawCommit>> {
        for start in starts {
            if !self.commits.contains_key(start) {
                return Err(BackendError::UnknownCommit(*start));
            }
        }

        // Iterative post-order DFS: a commit is emitted once all of its
        // stored parents have been emitted.
        let mut emitted: HashSet<CommitId> = HashSet::new();
        let mut out = Vec::new();
        let mut stack: Vec<(CommitId, bool)> = starts.iter().rev().map(|&id| (id, false)).collect();
        while let Some((id, expanded)) = stack.pop() {
            if emitted.contains(&id) {
                continue;
            }
            let Some(commit) = self.commits.get(&id) else {
                continue;
            };
            if expanded {
                emitted.insert(id);
                out.push(commit.clone());
                continue;
            }
            stack.push((id, true));
            for parent in commit.parents.iter().rev() {
                if !emitted.contains(parent) && self.commits.contains_key(parent) {
                    stack.push((*parent, false));
                }
            }
        }
        Ok(out)
    }
}

impl Backend for MemoryBackend {
    fn location(&self) -> &Path {
        &self.location
    }

    fn resolve_ref(&self, name: &str) -> Result<Option<CommitId>> {
        Ok(self.store.read().lookup(name))
    }

    fn current_branch(&self) -> Result<Option<String>> {
        Ok(match &self.store.read().head {
            Head::Unset => None,
            Head::Symbolic(target) => Some(target.clone()),
            Head::Detached(id) => Some(id.to_hex()),
        })
    }

    fn list_branches(&self, kind: RefKind) -> Result<Vec<BranchListing>> {
        let prefix = kind.prefix();
        let store = self.store.read();
        Ok(store
            .refs
            .range(prefix.to_string()..)
            .take_while(|(path, _)| path.starts_with(prefix))
            .map(|(path, id)| BranchListing {
                name: path[prefix.len()..].to_string(),
                ref_path: path.clone(),
                head: *id,
            })
            .collect())
    }

    fn walk_ancestry<'a>(&'a self, starts: &[CommitId]) -> Result<CommitIter<'a>> {
        let store = self.store.read();
        let mut commits = store.reachable(starts)?;
        if store.order == WalkOrder::ChildrenFirst {
            commits.reverse();
        }
        Ok(Box::new(commits.into_iter().map(Ok)))
    }

    fn branch_config(&self, branch: &str) -> Result<Option<Upstream>> {
        Ok(self.store.read().upstreams.get(branch).cloned())
    }

    fn list_tags(&self) -> Result<Vec<TagListing>> {
        let store = self.store.read();
        Ok(store
            .refs
            .range("refs/tags/".to_string()..)
            .take_while(|(path, _)| path.starts_with("refs/tags/"))
            .map(|(path, id)| TagListing {
                name: path["refs/tags/".len()..].to_string(),
                target: *id,
            })
            .collect())
    }
}
