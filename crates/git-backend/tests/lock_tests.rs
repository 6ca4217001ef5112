//! Concurrency tests for repository locks.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use git_backend::{Backend, LockRegistry, MemoryBackend};

#[test]
fn concurrent_get_yields_one_lock_per_path() {
    let registry = Arc::new(LockRegistry::new());
    let num_threads = 8;
    let barrier = Arc::new(Barrier::new(num_threads));

    let handles: Vec<_> = (0..num_threads)
        .map(|i| {
            let registry = Arc::clone(&registry);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                let path = if i % 2 == 0 { "/repo/even" } else { "/repo/odd" };
                registry.get(Path::new(path))
            })
        })
        .collect();

    let locks: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(registry.len(), 2);
    for (i, lock) in locks.iter().enumerate() {
        assert!(Arc::ptr_eq(lock, &locks[i % 2]));
    }
}

#[test]
fn readers_share_the_lock() {
    let registry = LockRegistry::new();
    let lock = registry.get(Path::new("/repo"));
    let num_threads = 4;
    let barrier = Arc::new(Barrier::new(num_threads));

    // Every reader waits on the barrier while holding the read lock, which
    // only completes if all of them hold it at once.
    let handles: Vec<_> = (0..num_threads)
        .map(|_| {
            let lock = Arc::clone(&lock);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || lock.read(|| barrier.wait().is_leader()))
        })
        .collect();

    let leaders = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|&leader| leader)
        .count();
    assert_eq!(leaders, 1);
}

#[test]
fn writer_excludes_readers() {
    let registry = LockRegistry::new();
    let lock = registry.get(Path::new("/repo"));
    let repo = Arc::new(MemoryBackend::new("/repo"));
    let base = repo.commit(&[], "base", 1);
    repo.set_ref("refs/heads/main", base);

    let in_write = Arc::new(AtomicUsize::new(0));
    let overlaps = Arc::new(AtomicUsize::new(0));
    let barrier = Arc::new(Barrier::new(2));

    let writer = {
        let lock = Arc::clone(&lock);
        let repo = Arc::clone(&repo);
        let in_write = Arc::clone(&in_write);
        let barrier = Arc::clone(&barrier);
        thread::spawn(move || {
            barrier.wait();
            for i in 0..50 {
                lock.write(|| {
                    in_write.store(1, Ordering::SeqCst);
                    let head = repo.resolve_ref("HEAD").unwrap().unwrap();
                    let next = repo.commit(&[head], "next", i + 2);
                    thread::sleep(Duration::from_micros(50));
                    repo.set_ref("refs/heads/main", next);
                    in_write.store(0, Ordering::SeqCst);
                });
            }
        })
    };

    let reader = {
        let lock = Arc::clone(&lock);
        let repo = Arc::clone(&repo);
        let in_write = Arc::clone(&in_write);
        let overlaps = Arc::clone(&overlaps);
        let barrier = Arc::clone(&barrier);
        thread::spawn(move || {
            barrier.wait();
            for _ in 0..50 {
                lock.read(|| {
                    if in_write.load(Ordering::SeqCst) != 0 {
                        overlaps.fetch_add(1, Ordering::SeqCst);
                    }
                    let head = repo.resolve_ref("HEAD").unwrap().unwrap();
                    let walked = repo.walk_ancestry(&[head]).unwrap().count();
                    assert!(walked >= 1);
                });
            }
        })
    };

    writer.join().unwrap();
    reader.join().unwrap();
    assert_eq!(overlaps.load(Ordering::SeqCst), 0);
    assert_eq!(repo.commit_count(), 51);
}
