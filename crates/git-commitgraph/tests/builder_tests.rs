//! Graph builder tests over the in-memory backend.

use std::sync::{Arc, Barrier};
use std::thread;

use git_backend::{Backend, MemoryBackend, RawCommit, RepoLock, WalkOrder};
use git_commitgraph::{
    BranchModel, BuildOptions, CommitId, CommitRegistry, GraphBuilder, GraphError, Locality,
    Reachability,
};
use proptest::prelude::*;

struct Repo {
    backend: Arc<MemoryBackend>,
    lock: Arc<RepoLock>,
    registry: CommitRegistry,
    branches: BranchModel,
}

impl Repo {
    fn new() -> Self {
        let backend = Arc::new(MemoryBackend::new("/test/repo"));
        let lock = Arc::new(RepoLock::new("/test/repo"));
        let branches = BranchModel::new(backend.clone(), lock.clone());
        Self {
            backend,
            lock,
            registry: CommitRegistry::new(),
            branches,
        }
    }

    fn builder(&self) -> GraphBuilder<'_> {
        GraphBuilder::new(self.backend.as_ref(), &self.lock, &self.registry)
    }
}

#[test]
fn master_and_feature_share_root() {
    let repo = Repo::new();
    let a = repo.backend.commit(&[], "A", 100);
    let b = repo.backend.commit(&[a], "B", 200);
    let c = repo.backend.commit(&[a], "C", 300);
    repo.backend.set_ref("refs/heads/master", b);
    repo.backend.set_ref("refs/heads/feature", c);
    repo.backend.set_head("refs/heads/master");
    repo.branches.update_all_branches().unwrap();

    let local = repo.builder().build_local(&repo.branches).unwrap();
    let remote = repo.builder().build_remote(&repo.branches).unwrap();
    assert_eq!(repo.registry.len(), 3);
    assert_eq!(local.len(), 3);
    assert!(remote.is_empty());
    assert!(local.dangling.is_empty());

    let root = repo.registry.get(&a).unwrap();
    let mut children = root.children();
    children.sort();
    let mut expected = vec![b, c];
    expected.sort();
    assert_eq!(children, expected);
    assert!(root.linked_parents().is_empty());

    let reach = Reachability::new();
    reach.set_local(local.ids());
    reach.set_remote(remote.ids());
    for id in [a, b, c] {
        assert_eq!(reach.classify(&id), Some(Locality::Local));
    }
}

#[test]
fn remote_only_commit() {
    let repo = Repo::new();
    let a = repo.backend.commit(&[], "A", 100);
    repo.backend.set_ref("refs/remotes/origin/master", a);
    repo.backend.set_ref("refs/remotes/origin/HEAD", a);
    repo.branches.update_all_branches().unwrap();

    let local = repo.builder().build_local(&repo.branches).unwrap();
    let remote = repo.builder().build_remote(&repo.branches).unwrap();
    assert!(local.is_empty());
    assert!(remote.contains(&a));

    let reach = Reachability::new();
    reach.set_local(local.ids());
    reach.set_remote(remote.ids());
    assert_eq!(reach.classify(&a), Some(Locality::Remote));
}

#[test]
fn overlapping_local_and_remote_builds_share_nodes() {
    let repo = Repo::new();
    let a = repo.backend.commit(&[], "A", 100);
    let b = repo.backend.commit(&[a], "B", 200);
    let c = repo.backend.commit(&[b], "C", 300);
    repo.backend.set_ref("refs/heads/main", c);
    repo.backend.set_ref("refs/remotes/origin/main", b);
    repo.backend.set_head("refs/heads/main");
    repo.branches.update_all_branches().unwrap();

    let local = repo.builder().build_local(&repo.branches).unwrap();
    let remote = repo.builder().build_remote(&repo.branches).unwrap();
    assert_eq!(repo.registry.len(), 3);

    let from_local = local.nodes.iter().find(|n| n.id() == b).unwrap();
    let from_remote = remote.nodes.iter().find(|n| n.id() == b).unwrap();
    assert!(Arc::ptr_eq(from_local, from_remote));

    let reach = Reachability::new();
    reach.set_local(local.ids());
    reach.set_remote(remote.ids());
    assert_eq!(reach.classify(&a), Some(Locality::Both));
    assert_eq!(reach.classify(&b), Some(Locality::Both));
    assert_eq!(reach.classify(&c), Some(Locality::Local));
}

#[test]
fn children_first_delivery_links_every_parent() {
    let repo = Repo::new();
    repo.backend.set_walk_order(WalkOrder::ChildrenFirst);
    let a = repo.backend.commit(&[], "A", 1);
    let b = repo.backend.commit(&[a], "B", 2);
    let c = repo.backend.commit(&[a], "C", 3);
    let m = repo.backend.commit(&[b, c], "M", 4);

    let outcome = repo.builder().build_from(&[m]).unwrap();
    assert_eq!(outcome.nodes[0].id(), m);
    assert!(outcome.dangling.is_empty());
    assert!(outcome.nodes.iter().all(|n| n.is_linked()));
    assert_eq!(repo.registry.pending_count(), 0);
    assert_eq!(repo.registry.get(&m).unwrap().linked_parents().len(), 2);
}

#[test]
fn duplicate_starts_walk_once() {
    let repo = Repo::new();
    let a = repo.backend.commit(&[], "A", 1);
    let b = repo.backend.commit(&[a], "B", 2);
    let outcome = repo.builder().build_from(&[b, b, a]).unwrap();
    assert_eq!(outcome.len(), 2);
}

#[test]
fn empty_seeds_skip_the_walk() {
    let repo = Repo::new();
    repo.branches.update_all_branches().unwrap();
    let outcome = repo.builder().build_local(&repo.branches).unwrap();
    assert!(outcome.is_empty());
    assert!(repo.registry.is_empty());
}

#[test]
fn missing_parent_is_reported_and_bounded() {
    let repo = Repo::new();
    let ghost: CommitId = "feedfacefeedfacefeedfacefeedfacefeedface".parse().unwrap();
    let a = repo.backend.commit(&[ghost], "A", 1);
    let b = repo.backend.commit(&[a], "B", 2);

    let builder = repo
        .builder()
        .with_options(BuildOptions { max_link_passes: 10 });
    let outcome = builder.build_from(&[b]).unwrap();
    assert_eq!(outcome.len(), 2);
    assert_eq!(outcome.dangling.len(), 1);
    assert_eq!(outcome.dangling[0].child, a);
    assert_eq!(outcome.dangling[0].parent, ghost);
    assert!(repo.registry.get(&b).unwrap().is_linked());
    assert_eq!(repo.registry.pending_parents(), vec![ghost]);

    // A later build does not re-park the same link.
    builder.build_from(&[b]).unwrap();
    assert_eq!(repo.registry.pending_count(), 1);
}

#[test]
fn late_parent_resolves_pending_link() {
    let repo = Repo::new();
    let a = repo.backend.commit(&[], "A", 1);
    let b = repo.backend.commit(&[a], "B", 2);

    // Register B alone first, with A absent from the registry.
    let raw_b = repo
        .backend
        .walk_ancestry(&[b])
        .unwrap()
        .map(Result::unwrap)
        .find(|c| c.id == b)
        .unwrap();
    let node_b = repo.registry.wrap(raw_b).unwrap();
    assert_eq!(repo.registry.link_parents(&node_b), 1);

    repo.builder().build_from(&[a]).unwrap();
    assert!(node_b.is_linked());
    assert_eq!(repo.registry.get(&a).unwrap().children(), vec![b]);
}

#[test]
fn backend_failure_propagates() {
    let repo = Repo::new();
    let ghost: CommitId = "0000000000000000000000000000000000000bad".parse().unwrap();
    let err = repo.builder().build_from(&[ghost]).unwrap_err();
    assert!(matches!(err, GraphError::Backend(_)));
}

#[test]
fn tags_attach_to_registered_commits() {
    let repo = Repo::new();
    let a = repo.backend.commit(&[], "A", 1);
    let b = repo.backend.commit(&[a], "B", 2);
    repo.backend.set_ref("refs/tags/v1", a);
    repo.backend.set_ref("refs/tags/v2", b);

    repo.builder().build_from(&[a]).unwrap();
    assert_eq!(repo.builder().refresh_tags().unwrap(), 1);
    assert_eq!(repo.registry.get(&a).unwrap().tags(), vec!["v1"]);

    repo.builder().build_from(&[b]).unwrap();
    assert_eq!(repo.builder().refresh_tags().unwrap(), 1);
    assert_eq!(repo.builder().refresh_tags().unwrap(), 0);
    assert_eq!(repo.registry.get(&b).unwrap().tags(), vec!["v2"]);
}

#[test]
fn concurrent_builds_agree_on_identity() {
    let backend = Arc::new(MemoryBackend::new("/test/repo"));
    let mut tip = backend.commit(&[], "root", 0);
    for i in 1..200 {
        tip = backend.commit(&[tip], "linear", i);
    }
    backend.set_walk_order(WalkOrder::ChildrenFirst);

    let lock = Arc::new(RepoLock::new("/test/repo"));
    let registry = Arc::new(CommitRegistry::new());
    let num_threads = 4;
    let barrier = Arc::new(Barrier::new(num_threads));

    let handles: Vec<_> = (0..num_threads)
        .map(|_| {
            let backend = Arc::clone(&backend);
            let lock = Arc::clone(&lock);
            let registry = Arc::clone(&registry);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                let builder = GraphBuilder::new(backend.as_ref(), &lock, &registry);
                builder.build_from(&[tip]).unwrap().nodes
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(registry.len(), 200);
    assert_eq!(registry.pending_count(), 0);
    for nodes in &results[1..] {
        assert_eq!(nodes.len(), 200);
        for (x, y) in nodes.iter().zip(&results[0]) {
            assert!(Arc::ptr_eq(x, y));
        }
    }
    assert!(registry.nodes().iter().all(|n| n.is_linked()));
}

fn raw(id: CommitId, parents: Vec<CommitId>) -> RawCommit {
    RawCommit {
        id,
        parents,
        author_name: "p".into(),
        author_email: "p@example.com".into(),
        timestamp: 0,
        message: "prop".into(),
    }
}

proptest! {
    #[test]
    fn wrap_is_idempotent_under_repetition(
        seeds in proptest::collection::vec(1u8..=20, 1..60)
    ) {
        let registry = CommitRegistry::new();
        let mut first = std::collections::HashMap::new();
        for seed in &seeds {
            let id = CommitId::Sha1([*seed; 20]);
            let node = registry.wrap(raw(id, vec![])).unwrap();
            let canonical = first.entry(id).or_insert_with(|| node.clone());
            prop_assert!(Arc::ptr_eq(canonical, &node));
        }
        prop_assert_eq!(registry.len(), first.len());
    }

    #[test]
    fn any_delivery_order_links_a_chain(
        order in Just((1u8..=12).collect::<Vec<_>>()).prop_shuffle()
    ) {
        let registry = CommitRegistry::new();
        for n in &order {
            let id = CommitId::Sha1([*n; 20]);
            let parents = if *n == 1 { vec![] } else { vec![CommitId::Sha1([*n - 1; 20])] };
            let node = registry.wrap(raw(id, parents)).unwrap();
            registry.link_parents(&node);
        }
        prop_assert_eq!(registry.pending_count(), 0);
        prop_assert!(registry.nodes().iter().all(|n| n.is_linked()));
    }
}
