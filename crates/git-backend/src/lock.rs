//! Per-repository read/write locking.
//!
//! A backend is safe for concurrent metadata queries but not for concurrent
//! working-tree mutation. Every query made on behalf of the commit graph runs
//! under [`RepoLock::read`]; anything that can move refs or touch the working
//! tree runs under [`RepoLock::write`].
//!
//! Locks are handed out by a [`LockRegistry`] keyed by repository location.
//! The registry is an ordinary owned value held by the application's session
//! state; entries are created on first request and live as long as it does.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::RwLock;
use tracing::trace;

/// Read/write lock scoped to one repository location.
///
/// Closures passed to [`read`](RepoLock::read) and
/// [`write`](RepoLock::write) must not re-enter the same lock.
#[derive(Debug)]
pub struct RepoLock {
    path: PathBuf,
    lock: RwLock<()>,
}

impl RepoLock {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: RwLock::new(()),
        }
    }

    /// Repository location this lock guards.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run `op` holding the shared lock.
    pub fn read<T>(&self, op: impl FnOnce() -> T) -> T {
        let _guard = self.lock.read();
        trace!(path = %self.path.display(), "read lock acquired");
        op()
    }

    /// Run `op` holding the exclusive lock.
    pub fn write<T>(&self, op: impl FnOnce() -> T) -> T {
        let _guard = self.lock.write();
        trace!(path = %self.path.display(), "write lock acquired");
        op()
    }

    /// Whether any thread currently holds the exclusive lock.
    pub fn is_write_locked(&self) -> bool {
        self.lock.is_locked_exclusive()
    }
}

/// Owning container of [`RepoLock`]s, one per repository location.
#[derive(Debug, Default)]
pub struct LockRegistry {
    locks: DashMap<PathBuf, Arc<RepoLock>>,
}

impl LockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The lock for `path`, created on first request. Every call with the
    /// same path returns the same lock.
    pub fn get(&self, path: &Path) -> Arc<RepoLock> {
        Arc::clone(
            self.locks
                .entry(path.to_path_buf())
                .or_insert_with(|| Arc::new(RepoLock::new(path)))
                .value(),
        )
    }

    /// Number of repositories with a lock.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
