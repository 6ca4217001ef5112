//! Branch model tests: listing, current branch, tracking.

use std::sync::Arc;

use git_backend::{MemoryBackend, RefKind, RepoLock};
use git_commitgraph::{BranchKind, BranchModel, CommitId};

fn setup() -> (Arc<MemoryBackend>, BranchModel, CommitId, CommitId) {
    let backend = Arc::new(MemoryBackend::new("/test/repo"));
    let lock = Arc::new(RepoLock::new("/test/repo"));
    let a = backend.commit(&[], "A", 1);
    let b = backend.commit(&[a], "B", 2);
    backend.set_ref("refs/heads/main", b);
    backend.set_ref("refs/heads/topic", b);
    backend.set_ref("refs/heads/old", a);
    backend.set_ref("refs/remotes/origin/main", a);
    backend.set_ref("refs/remotes/origin/HEAD", a);
    backend.set_ref("refs/remotes/upstream/main", b);
    backend.set_head("refs/heads/main");
    backend.set_upstream("main", "origin", "refs/heads/main");
    let model = BranchModel::new(backend.clone(), lock);
    model.update_all_branches().unwrap();
    (backend, model, a, b)
}

#[test]
fn remote_head_pseudo_ref_is_dropped() {
    let (_, model, _, _) = setup();
    let remote: Vec<_> = model.remote_branches().iter().map(|b| b.name.clone()).collect();
    assert_eq!(remote, vec!["origin/main", "upstream/main"]);
    assert!(model
        .remote_branches()
        .iter()
        .all(|b| matches!(&b.kind, BranchKind::Remote { remote } if !remote.is_empty())));
}

#[test]
fn current_branch_matches_local_listing() {
    let (_, model, _, b) = setup();
    let current = model.current_branch().unwrap();
    assert_eq!(current.name, "main");
    assert_eq!(current.head, b);
    assert!(current.is_local());
    assert_eq!(
        current.upstream_ref_path().as_deref(),
        Some("refs/remotes/origin/main")
    );
}

#[test]
fn detached_head_synthesizes_a_ref() {
    let (backend, model, a, _) = setup();
    backend.detach_head(a);
    model.refresh_current_branch().unwrap();

    let current = model.current_branch().unwrap();
    assert_eq!(current.name, a.to_hex());
    assert_eq!(current.head, a);
    assert!(current.is_local());
    assert!(model.branch_by_name(RefKind::Local, &a.to_hex()).is_none());
}

#[test]
fn no_current_branch_when_head_is_unreadable() {
    let (backend, model, _, _) = setup();
    backend.clear_head();
    model.refresh_current_branch().unwrap();
    assert!(model.current_branch().is_none());
}

#[test]
fn tracking_is_config_based() {
    let (_, model, _, _) = setup();
    let main = model.branch_by_name(RefKind::Local, "main").unwrap();
    let topic = model.branch_by_name(RefKind::Local, "topic").unwrap();
    let origin_main = model.branch_by_name(RefKind::Remote, "origin/main").unwrap();
    let upstream_main = model.branch_by_name(RefKind::Remote, "upstream/main").unwrap();

    assert!(model.is_tracked(&main));
    assert!(!model.is_tracked(&topic));
    assert!(model.is_tracked(&origin_main));
    // Same head as main, but nothing tracks it.
    assert!(!model.is_tracked(&upstream_main));
}

#[test]
fn current_includes_tracked_remote() {
    let (_, model, _, _) = setup();
    let main = model.branch_by_name(RefKind::Local, "main").unwrap();
    let topic = model.branch_by_name(RefKind::Local, "topic").unwrap();
    let origin_main = model.branch_by_name(RefKind::Remote, "origin/main").unwrap();
    let upstream_main = model.branch_by_name(RefKind::Remote, "upstream/main").unwrap();

    assert!(model.is_current(&main));
    assert!(model.is_current(&origin_main));
    assert!(!model.is_current(&topic));
    assert!(!model.is_current(&upstream_main));
}

#[test]
fn branches_with_shared_head_are_all_returned() {
    let (_, model, a, b) = setup();
    let at_b: Vec<_> = model
        .branches_with_head(&b)
        .into_iter()
        .map(|br| br.name)
        .collect();
    assert_eq!(at_b, vec!["main", "topic", "upstream/main"]);

    let heads = model.all_branch_heads();
    assert_eq!(heads[&a].len(), 2);
    assert_eq!(heads[&b].len(), 3);
}

#[test]
fn refresh_replaces_lists_wholesale() {
    let (backend, model, a, _) = setup();
    let before = model.local_branches();
    backend.delete_ref("refs/heads/topic");
    backend.set_ref("refs/heads/new", a);
    model.update_all_branches().unwrap();

    let names: Vec<_> = model.local_branches().iter().map(|b| b.name.clone()).collect();
    assert_eq!(names, vec!["main", "new", "old"]);
    // A snapshot taken earlier is unaffected.
    assert_eq!(before.len(), 3);
    assert!(before.iter().any(|b| b.name == "topic"));
}
