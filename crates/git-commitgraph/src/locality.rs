use std::collections::HashSet;
use std::sync::Arc;

use arc_swap::ArcSwap;
use git_hash::CommitId;

/// Where a commit is reachable from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Locality {
    Local,
    Remote,
    Both,
}

impl Locality {
    /// One-letter marker used in listings.
    pub fn marker(self) -> char {
        match self {
            Locality::Local => 'L',
            Locality::Remote => 'R',
            Locality::Both => 'B',
        }
    }
}

/// Id sets of the most recent local and remote builds.
///
/// Each set is swapped in whole after its build completes; locality is
/// derived from them on demand and never stored on a node.
#[derive(Debug)]
pub struct Reachability {
    local: ArcSwap<HashSet<CommitId>>,
    remote: ArcSwap<HashSet<CommitId>>,
}

impl Default for Reachability {
    fn default() -> Self {
        Self {
            local: ArcSwap::from_pointee(HashSet::new()),
            remote: ArcSwap::from_pointee(HashSet::new()),
        }
    }
}

impl Reachability {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_local(&self, ids: HashSet<CommitId>) {
        self.local.store(Arc::new(ids));
    }

    pub fn set_remote(&self, ids: HashSet<CommitId>) {
        self.remote.store(Arc::new(ids));
    }

    /// `None` if neither the local nor the remote build reached `id`.
    pub fn classify(&self, id: &CommitId) -> Option<Locality> {
        let local = self.local.load().contains(id);
        let remote = self.remote.load().contains(id);
        match (local, remote) {
            (true, true) => Some(Locality::Both),
            (true, false) => Some(Locality::Local),
            (false, true) => Some(Locality::Remote),
            (false, false) => None,
        }
    }

    pub fn local_len(&self) -> usize {
        self.local.load().len()
    }

    pub fn remote_len(&self) -> usize {
        self.remote.load().len()
    }
}
