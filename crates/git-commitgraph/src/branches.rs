//! Local and remote branch lists and the current branch.

use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::{ArcSwap, ArcSwapOption};
use git_backend::{Backend, RefKind, RepoLock};
use git_hash::CommitId;
use tracing::debug;

use crate::branch::{BranchKind, BranchRef};
use crate::Result;

/// Branch state for one repository.
///
/// Each list is replaced wholesale on refresh by an atomic swap, so readers
/// see either the previous complete list or the new one.
pub struct BranchModel {
    backend: Arc<dyn Backend>,
    lock: Arc<RepoLock>,
    local: ArcSwap<Vec<BranchRef>>,
    remote: ArcSwap<Vec<BranchRef>>,
    current: ArcSwapOption<BranchRef>,
}

impl BranchModel {
    pub fn new(backend: Arc<dyn Backend>, lock: Arc<RepoLock>) -> Self {
        Self {
            backend,
            lock,
            local: ArcSwap::from_pointee(Vec::new()),
            remote: ArcSwap::from_pointee(Vec::new()),
            current: ArcSwapOption::empty(),
        }
    }

    /// Re-read every local and remote branch and the current branch.
    ///
    /// `HEAD` pseudo-refs in the remote namespace (`origin/HEAD`) are
    /// dropped. On error the previous lists stay in place.
    pub fn update_all_branches(&self) -> Result<()> {
        let (local, remote) = self.lock.read(|| -> Result<_> {
            let mut local = Vec::new();
            for listing in self.backend.list_branches(RefKind::Local)? {
                let upstream = self.backend.branch_config(&listing.name)?;
                local.push(BranchRef::local(listing, upstream));
            }
            let remote: Vec<_> = self
                .backend
                .list_branches(RefKind::Remote)?
                .into_iter()
                .filter(|listing| listing.name != "HEAD" && !listing.name.ends_with("/HEAD"))
                .map(BranchRef::remote)
                .collect();
            Ok((local, remote))
        })?;

        debug!(local = local.len(), remote = remote.len(), "branch lists refreshed");
        self.local.store(Arc::new(local));
        self.remote.store(Arc::new(remote));
        self.refresh_current_branch()
    }

    /// Resolve the backend's current branch against the local list.
    ///
    /// A detached `HEAD` gets a transient local ref named after the raw ref
    /// string. An unborn branch, or a backend with no current branch, leaves
    /// no current branch.
    pub fn refresh_current_branch(&self) -> Result<()> {
        let current = self.lock.read(|| -> Result<Option<BranchRef>> {
            let Some(target) = self.backend.current_branch()? else {
                return Ok(None);
            };
            if let Some(branch) = self.local.load().iter().find(|b| b.ref_path == target) {
                return Ok(Some(branch.clone()));
            }
            let head = match CommitId::from_hex(&target) {
                Ok(id) => Some(id),
                Err(_) => self.backend.resolve_ref(&target)?,
            };
            Ok(head.map(|head| BranchRef {
                name: target.clone(),
                ref_path: target,
                head,
                kind: BranchKind::Local { upstream: None },
            }))
        })?;
        self.current.store(current.map(Arc::new));
        Ok(())
    }

    pub fn local_branches(&self) -> Arc<Vec<BranchRef>> {
        self.local.load_full()
    }

    pub fn remote_branches(&self) -> Arc<Vec<BranchRef>> {
        self.remote.load_full()
    }

    pub fn current_branch(&self) -> Option<Arc<BranchRef>> {
        self.current.load_full()
    }

    pub fn branch_by_name(&self, kind: RefKind, name: &str) -> Option<BranchRef> {
        let list = match kind {
            RefKind::Local => self.local.load(),
            RefKind::Remote => self.remote.load(),
        };
        list.iter().find(|b| b.name == name).cloned()
    }

    /// A local branch is tracked if it has an upstream configured; a remote
    /// branch is tracked if some local branch names it as upstream.
    pub fn is_tracked(&self, branch: &BranchRef) -> bool {
        match &branch.kind {
            BranchKind::Local { upstream } => upstream.is_some(),
            BranchKind::Remote { .. } => self.local.load().iter().any(|local| {
                local.upstream_ref_path().as_deref() == Some(branch.ref_path.as_str())
            }),
        }
    }

    /// The checked-out branch, or the remote branch it tracks.
    pub fn is_current(&self, branch: &BranchRef) -> bool {
        let Some(current) = self.current.load_full() else {
            return false;
        };
        if current.ref_path == branch.ref_path {
            return true;
        }
        branch.is_remote()
            && current.upstream_ref_path().as_deref() == Some(branch.ref_path.as_str())
    }

    /// Every branch whose head is `id`: local branches first, then remote,
    /// each in listing order.
    pub fn branches_with_head(&self, id: &CommitId) -> Vec<BranchRef> {
        let local = self.local.load();
        let remote = self.remote.load();
        local
            .iter()
            .chain(remote.iter())
            .filter(|b| b.head == *id)
            .cloned()
            .collect()
    }

    /// Head commit -> branches pointing at it.
    pub fn all_branch_heads(&self) -> HashMap<CommitId, Vec<BranchRef>> {
        let mut heads: HashMap<CommitId, Vec<BranchRef>> = HashMap::new();
        for branch in self.local.load().iter().chain(self.remote.load().iter()) {
            heads.entry(branch.head).or_default().push(branch.clone());
        }
        heads
    }
}

impl std::fmt::Debug for BranchModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BranchModel")
            .field("local", &self.local.load().len())
            .field("remote", &self.remote.load().len())
            .field("current", &self.current.load_full().map(|b| b.name.clone()))
            .finish()
    }
}
