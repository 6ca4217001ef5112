//! A writer extends the model while readers take snapshots.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

use git_treemodel::{CellSpec, CommitId, TreeModel};

fn cid(i: u32) -> CommitId {
    let mut bytes = [0xaa; 20];
    bytes[..4].copy_from_slice(&i.to_be_bytes());
    CommitId::Sha1(bytes)
}

fn index(id: &CommitId) -> u32 {
    let b = id.as_bytes();
    u32::from_be_bytes([b[0], b[1], b[2], b[3]])
}

/// Commit `i` has parent `i - 1`, and every tenth commit also merges `i - 5`.
fn spec(id: &CommitId) -> Option<CellSpec> {
    let i = index(id);
    let mut parents = Vec::new();
    if i > 0 {
        parents.push(cid(i - 1));
    }
    if i >= 5 && i % 10 == 0 {
        parents.push(cid(i - 5));
    }
    Some(CellSpec {
        id: *id,
        sort_key: i as i64,
        label: format!("commit {i}"),
        parents,
    })
}

#[test]
fn readers_never_observe_a_partial_batch() {
    let model = Arc::new(TreeModel::new());
    let done = Arc::new(AtomicBool::new(false));
    let num_readers = 3;
    let barrier = Arc::new(Barrier::new(num_readers + 1));

    let writer = {
        let model = Arc::clone(&model);
        let done = Arc::clone(&done);
        let barrier = Arc::clone(&barrier);
        thread::spawn(move || {
            barrier.wait();
            // Reveal every other commit, relying on placeholders for the rest.
            for i in (1..2000u32).step_by(2) {
                let id = cid(i);
                model.add_invisible_commit(id, &spec);
                if let Some(s) = spec(&id) {
                    model.add_cell(s, true);
                }
                if i % 7 == 0 {
                    model.update();
                }
            }
            model.update();
            done.store(true, Ordering::SeqCst);
        })
    };

    let readers: Vec<_> = (0..num_readers)
        .map(|_| {
            let model = Arc::clone(&model);
            let done = Arc::clone(&done);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                let mut seen_visible: HashSet<CommitId> = HashSet::new();
                let mut last_generation = 0;
                loop {
                    let finished = done.load(Ordering::SeqCst);
                    let snapshot = model.snapshot();

                    assert!(snapshot.generation() >= last_generation);
                    last_generation = snapshot.generation();
                    assert!(snapshot.dangling_edges().is_empty());
                    assert_eq!(snapshot.cells().len(), snapshot.len());
                    for cell in snapshot.cells() {
                        for parent in &cell.parents {
                            assert!(snapshot.contains(parent));
                        }
                    }
                    for id in &seen_visible {
                        assert!(snapshot.is_visible(id), "visibility reverted");
                    }
                    seen_visible.extend(snapshot.visible_cells().iter().map(|c| c.id));

                    if finished {
                        break;
                    }
                }
                seen_visible.len()
            })
        })
        .collect();

    writer.join().unwrap();
    for reader in readers {
        assert_eq!(reader.join().unwrap(), 1000);
    }
    assert_eq!(model.len(), 2000);
    assert_eq!(model.visible_cells().len(), 1000);
}
