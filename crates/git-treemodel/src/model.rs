use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use arc_swap::ArcSwap;
use git_hash::CommitId;
use parking_lot::Mutex;
use tracing::debug;

use crate::cell::{Cell, CellChange, CellSpec, CellState};

/// Supplies cell data for commits reached while adding ancestors.
pub trait AncestrySource {
    /// `None` if the commit is unknown; its edges are left dangling.
    fn cell_spec(&self, id: &CommitId) -> Option<CellSpec>;
}

impl<F> AncestrySource for F
where
    F: Fn(&CommitId) -> Option<CellSpec>,
{
    fn cell_spec(&self, id: &CommitId) -> Option<CellSpec> {
        self(id)
    }
}

/// Immutable committed state of a [`TreeModel`].
#[derive(Debug, Default)]
pub struct TreeSnapshot {
    cells: HashMap<CommitId, Arc<Cell>>,
    /// All cells ordered by `(sort_key, seq)`.
    ordered: Vec<Arc<Cell>>,
    dangling: Vec<(CommitId, CommitId)>,
    generation: u64,
}

impl TreeSnapshot {
    /// Visible cells in `(sort_key, seq)` order.
    pub fn visible_cells(&self) -> Vec<Arc<Cell>> {
        self.ordered
            .iter()
            .filter(|c| c.is_visible())
            .cloned()
            .collect()
    }

    /// Every cell, visible or not, in `(sort_key, seq)` order.
    pub fn cells(&self) -> &[Arc<Cell>] {
        &self.ordered
    }

    pub fn cell(&self, id: &CommitId) -> Option<Arc<Cell>> {
        self.cells.get(id).cloned()
    }

    /// Parent edges of a cell; empty if the cell is absent. Targets may be
    /// absent from the model.
    pub fn edges(&self, id: &CommitId) -> Vec<CommitId> {
        self.cells
            .get(id)
            .map(|c| c.parents.clone())
            .unwrap_or_default()
    }

    pub fn contains(&self, id: &CommitId) -> bool {
        self.cells.contains_key(id)
    }

    pub fn is_visible(&self, id: &CommitId) -> bool {
        self.cells.get(id).is_some_and(|c| c.is_visible())
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// `(child, parent)` edges whose parent has no cell.
    pub fn dangling_edges(&self) -> &[(CommitId, CommitId)] {
        &self.dangling
    }

    /// Incremented by every `update` that changed something.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[derive(Debug, Default)]
struct Batch {
    added: Vec<Cell>,
    index: HashMap<CommitId, usize>,
    reveals: Vec<CommitId>,
    next_seq: u64,
}

impl Batch {
    fn is_empty(&self) -> bool {
        self.added.is_empty() && self.reveals.is_empty()
    }
}

/// Append-only cell model shared between one writer and any number of
/// readers.
#[derive(Debug, Default)]
pub struct TreeModel {
    pending: Mutex<Batch>,
    committed: ArcSwap<TreeSnapshot>,
}

impl TreeModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage a cell.
    ///
    /// An existing cell is left alone unless it is invisible and `visible`
    /// is requested, in which case it is revealed in place; its edges are
    /// kept as first recorded.
    pub fn add_cell(&self, spec: CellSpec, visible: bool) -> CellChange {
        let mut batch = self.pending.lock();
        self.stage(&mut batch, spec, visible)
    }

    fn stage(&self, batch: &mut Batch, spec: CellSpec, visible: bool) -> CellChange {
        if let Some(&idx) = batch.index.get(&spec.id) {
            let cell = &mut batch.added[idx];
            if visible && cell.state == CellState::Invisible {
                cell.state = CellState::Visible;
                return CellChange::Revealed;
            }
            return CellChange::Unchanged;
        }

        if let Some(cell) = self.committed.load().cells.get(&spec.id) {
            if visible && cell.state == CellState::Invisible && !batch.reveals.contains(&spec.id) {
                batch.reveals.push(spec.id);
                return CellChange::Revealed;
            }
            return CellChange::Unchanged;
        }

        let state = if visible {
            CellState::Visible
        } else {
            CellState::Invisible
        };
        let seq = batch.next_seq;
        batch.next_seq += 1;
        batch.index.insert(spec.id, batch.added.len());
        batch.added.push(Cell::new(spec, state, seq));
        CellChange::Added
    }

    fn present(&self, batch: &Batch, id: &CommitId) -> bool {
        batch.index.contains_key(id) || self.committed.load().cells.contains_key(id)
    }

    /// Stage `id` as an invisible cell, preceded by every ancestor that is
    /// not in the model yet.
    ///
    /// Ancestors are staged strictly before their descendants. Commits the
    /// source does not know are skipped. Returns how many cells were staged.
    pub fn add_invisible_commit(&self, id: CommitId, source: &dyn AncestrySource) -> usize {
        let mut batch = self.pending.lock();
        if self.present(&batch, &id) {
            return 0;
        }

        let mut specs: HashMap<CommitId, CellSpec> = HashMap::new();
        let mut visited: HashSet<CommitId> = HashSet::new();
        let mut stack = vec![(id, false)];
        let mut staged = 0;

        while let Some((current, expanded)) = stack.pop() {
            if expanded {
                if let Some(spec) = specs.remove(&current) {
                    if self.stage(&mut batch, spec, false) == CellChange::Added {
                        staged += 1;
                    }
                }
                continue;
            }
            if !visited.insert(current) || self.present(&batch, &current) {
                continue;
            }
            let Some(spec) = source.cell_spec(&current) else {
                debug!(commit = %current.short(), "ancestor unknown, edge left dangling");
                continue;
            };
            stack.push((current, true));
            for parent in spec.parents.iter().rev() {
                if !visited.contains(parent) && !self.present(&batch, parent) {
                    stack.push((*parent, false));
                }
            }
            specs.insert(current, spec);
        }
        staged
    }

    /// Apply the pending batch. Returns `false`, and leaves the snapshot
    /// untouched, if nothing was staged.
    pub fn update(&self) -> bool {
        let mut batch = self.pending.lock();
        if batch.is_empty() {
            return false;
        }

        let current = self.committed.load_full();
        let mut cells = current.cells.clone();
        for id in batch.reveals.drain(..) {
            if let Some(cell) = cells.get_mut(&id) {
                let mut revealed = Cell::clone(cell);
                revealed.state = CellState::Visible;
                *cell = Arc::new(revealed);
            }
        }
        for cell in batch.added.drain(..) {
            cells.insert(cell.id, Arc::new(cell));
        }
        batch.index.clear();

        let mut ordered: Vec<Arc<Cell>> = cells.values().cloned().collect();
        ordered.sort_by_key(|c| c.order_key());

        let dangling: Vec<(CommitId, CommitId)> = ordered
            .iter()
            .flat_map(|c| {
                c.parents
                    .iter()
                    .filter(|p| !cells.contains_key(p))
                    .map(|p| (c.id, *p))
                    .collect::<Vec<_>>()
            })
            .collect();
        if !dangling.is_empty() {
            debug!(count = dangling.len(), "dangling edges in model");
        }

        let generation = current.generation + 1;
        debug!(cells = cells.len(), generation, "tree model updated");
        self.committed.store(Arc::new(TreeSnapshot {
            cells,
            ordered,
            dangling,
            generation,
        }));
        true
    }

    /// The committed state. Hold on to it to answer several queries from
    /// one consistent view.
    pub fn snapshot(&self) -> Arc<TreeSnapshot> {
        self.committed.load_full()
    }

    /// Number of cells staged but not yet applied.
    pub fn pending_len(&self) -> usize {
        let batch = self.pending.lock();
        batch.added.len() + batch.reveals.len()
    }

    pub fn visible_cells(&self) -> Vec<Arc<Cell>> {
        self.committed.load().visible_cells()
    }

    pub fn cells(&self) -> Vec<Arc<Cell>> {
        self.committed.load().cells().to_vec()
    }

    pub fn cell(&self, id: &CommitId) -> Option<Arc<Cell>> {
        self.committed.load().cell(id)
    }

    pub fn edges(&self, id: &CommitId) -> Vec<CommitId> {
        self.committed.load().edges(id)
    }

    pub fn contains(&self, id: &CommitId) -> bool {
        self.committed.load().contains(id)
    }

    pub fn is_visible(&self, id: &CommitId) -> bool {
        self.committed.load().is_visible(id)
    }

    pub fn len(&self) -> usize {
        self.committed.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.committed.load().is_empty()
    }

    pub fn dangling_edges(&self) -> Vec<(CommitId, CommitId)> {
        self.committed.load().dangling_edges().to_vec()
    }

    pub fn generation(&self) -> u64 {
        self.committed.load().generation()
    }
}
