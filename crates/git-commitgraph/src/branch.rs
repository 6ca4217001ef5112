use git_backend::{BranchListing, Upstream};
use git_hash::CommitId;

/// What kind of branch a [`BranchRef`] is, with the data only that kind has.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BranchKind {
    Local { upstream: Option<Upstream> },
    Remote { remote: String },
}

/// A branch as seen at the last branch refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchRef {
    /// `main`, `origin/main`, or the raw ref string for a detached `HEAD`.
    pub name: String,
    pub ref_path: String,
    pub head: CommitId,
    pub kind: BranchKind,
}

impl BranchRef {
    pub(crate) fn local(listing: BranchListing, upstream: Option<Upstream>) -> Self {
        Self {
            name: listing.name,
            ref_path: listing.ref_path,
            head: listing.head,
            kind: BranchKind::Local { upstream },
        }
    }

    pub(crate) fn remote(listing: BranchListing) -> Self {
        let remote = listing
            .name
            .split_once('/')
            .map(|(remote, _)| remote.to_string())
            .unwrap_or_default();
        Self {
            name: listing.name,
            ref_path: listing.ref_path,
            head: listing.head,
            kind: BranchKind::Remote { remote },
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self.kind, BranchKind::Local { .. })
    }

    pub fn is_remote(&self) -> bool {
        matches!(self.kind, BranchKind::Remote { .. })
    }

    pub fn upstream(&self) -> Option<&Upstream> {
        match &self.kind {
            BranchKind::Local { upstream } => upstream.as_ref(),
            BranchKind::Remote { .. } => None,
        }
    }

    /// Remote-tracking ref this local branch follows, if configured.
    pub fn upstream_ref_path(&self) -> Option<String> {
        self.upstream().map(Upstream::tracking_ref_path)
    }

    /// Name of the remote a remote branch belongs to.
    pub fn remote_name(&self) -> Option<&str> {
        match &self.kind {
            BranchKind::Remote { remote } => Some(remote),
            BranchKind::Local { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing(name: &str, ref_path: &str) -> BranchListing {
        BranchListing {
            name: name.into(),
            ref_path: ref_path.into(),
            head: CommitId::Sha1([1; 20]),
        }
    }

    #[test]
    fn remote_name_is_first_component() {
        let branch =
            BranchRef::remote(listing("origin/feature/x", "refs/remotes/origin/feature/x"));
        assert!(branch.is_remote());
        assert_eq!(branch.remote_name(), Some("origin"));
        assert_eq!(branch.upstream_ref_path(), None);
    }

    #[test]
    fn local_upstream_path() {
        let upstream = Upstream {
            remote: "origin".into(),
            merge_ref: "refs/heads/main".into(),
        };
        let branch = BranchRef::local(listing("main", "refs/heads/main"), Some(upstream));
        assert!(branch.is_local());
        assert_eq!(branch.upstream_ref_path().as_deref(), Some("refs/remotes/origin/main"));
    }
}
