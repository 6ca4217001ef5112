use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use git_backend::{Backend, LockRegistry};
use tracing::debug;

use crate::config::GraphConfig;
use crate::context::RepoContext;

/// Top-level owner of every open repository and its lock.
///
/// Opening the same location twice yields the same context. Contexts and
/// locks live as long as the session.
#[derive(Debug, Default)]
pub struct Session {
    locks: LockRegistry,
    repos: DashMap<PathBuf, Arc<RepoContext>>,
    config: GraphConfig,
}

impl Session {
    pub fn new(config: GraphConfig) -> Self {
        Self {
            locks: LockRegistry::new(),
            repos: DashMap::new(),
            config,
        }
    }

    /// The context for `backend`'s location, created on first open.
    pub fn open(&self, backend: Arc<dyn Backend>) -> Arc<RepoContext> {
        let path = backend.location().to_path_buf();
        let context = self.repos.entry(path.clone()).or_insert_with(|| {
            debug!(path = %path.display(), "opening repository context");
            let lock = self.locks.get(&path);
            Arc::new(RepoContext::new(backend, lock, self.config.clone()))
        });
        Arc::clone(context.value())
    }

    pub fn get(&self, path: &Path) -> Option<Arc<RepoContext>> {
        self.repos.get(path).map(|entry| Arc::clone(entry.value()))
    }

    /// Locations of every open repository, sorted.
    pub fn repositories(&self) -> Vec<PathBuf> {
        let mut paths: Vec<_> = self.repos.iter().map(|entry| entry.key().clone()).collect();
        paths.sort();
        paths
    }

    pub fn locks(&self) -> &LockRegistry {
        &self.locks
    }

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }
}
