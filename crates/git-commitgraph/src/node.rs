use std::fmt;

use chrono::{DateTime, Utc};
use git_backend::RawCommit;
use git_hash::CommitId;
use parking_lot::RwLock;

/// A wrapped commit.
///
/// Everything read from the backend is immutable. Parent/child links are
/// filled in by the registry as the commits they point at are registered,
/// and tags may be appended later; both only ever grow.
pub struct CommitNode {
    id: CommitId,
    parents: Vec<CommitId>,
    author_name: String,
    author_email: String,
    timestamp: i64,
    message_full: String,
    message_short: String,
    links: RwLock<Links>,
    tags: RwLock<Vec<String>>,
}

#[derive(Default)]
struct Links {
    parents: Vec<CommitId>,
    children: Vec<CommitId>,
}

impl CommitNode {
    pub(crate) fn from_raw(raw: RawCommit) -> Self {
        let message_short = raw.message.lines().next().unwrap_or_default().to_string();
        Self {
            id: raw.id,
            parents: raw.parents,
            author_name: raw.author_name,
            author_email: raw.author_email,
            timestamp: raw.timestamp,
            message_full: raw.message,
            message_short,
            links: RwLock::new(Links::default()),
            tags: RwLock::new(Vec::new()),
        }
    }

    pub fn id(&self) -> CommitId {
        self.id
    }

    /// Parent ids as recorded in the commit, first parent first.
    pub fn parents(&self) -> &[CommitId] {
        &self.parents
    }

    pub fn author_name(&self) -> &str {
        &self.author_name
    }

    pub fn author_email(&self) -> &str {
        &self.author_email
    }

    /// Author time in seconds since the epoch.
    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn message_full(&self) -> &str {
        &self.message_full
    }

    /// First line of the message.
    pub fn message_short(&self) -> &str {
        &self.message_short
    }

    /// Parents that are registered and attached, in attachment order.
    pub fn linked_parents(&self) -> Vec<CommitId> {
        self.links.read().parents.clone()
    }

    /// Registered children that named this commit as a parent.
    pub fn children(&self) -> Vec<CommitId> {
        self.links.read().children.clone()
    }

    /// Recorded parents that have not been attached yet.
    pub fn unlinked_parents(&self) -> Vec<CommitId> {
        let links = self.links.read();
        self.parents
            .iter()
            .filter(|p| !links.parents.contains(p))
            .copied()
            .collect()
    }

    /// Whether every recorded parent has been attached.
    pub fn is_linked(&self) -> bool {
        let links = self.links.read();
        self.parents.iter().all(|p| links.parents.contains(p))
    }

    pub fn tags(&self) -> Vec<String> {
        self.tags.read().clone()
    }

    /// Returns `false` if the tag was already present.
    pub(crate) fn add_tag(&self, name: &str) -> bool {
        let mut tags = self.tags.write();
        if tags.iter().any(|t| t == name) {
            return false;
        }
        tags.push(name.to_string());
        true
    }

    pub(crate) fn attach_parent(&self, parent: CommitId) -> bool {
        let mut links = self.links.write();
        if links.parents.contains(&parent) {
            return false;
        }
        links.parents.push(parent);
        true
    }

    pub(crate) fn attach_child(&self, child: CommitId) {
        let mut links = self.links.write();
        if !links.children.contains(&child) {
            links.children.push(child);
        }
    }

    /// Author time rendered like `Tue Nov 14 22:13:20 2023` (UTC).
    pub fn formatted_when(&self) -> String {
        match DateTime::<Utc>::from_timestamp(self.timestamp, 0) {
            Some(when) => when.format("%a %b %-d %H:%M:%S %Y").to_string(),
            None => self.timestamp.to_string(),
        }
    }

    /// Multi-line description shown for a selected commit.
    pub fn descriptor(&self, full: bool) -> String {
        let message = if full {
            &self.message_full
        } else {
            &self.message_short
        };
        format!(
            "Commit ID: {}\n\nAuthor: {}\n\nTime: {}\n\nMessage: {}",
            self.id.short(),
            self.author_name,
            self.formatted_when(),
            message
        )
    }
}

impl fmt::Debug for CommitNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommitNode")
            .field("id", &self.id)
            .field("parents", &self.parents)
            .field("message", &self.message_short)
            .finish_non_exhaustive()
    }
}
