use git_hash::CommitId;

/// Visibility of a cell. Only `Invisible -> Visible` is ever applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellState {
    /// Ancestor placeholder, present so that edges resolve.
    Invisible,
    Visible,
}

/// What a writer supplies for a commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellSpec {
    pub id: CommitId,
    /// Commit time; cells are ordered by it.
    pub sort_key: i64,
    pub label: String,
    pub parents: Vec<CommitId>,
}

/// One commit in the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    pub id: CommitId,
    pub sort_key: i64,
    pub label: String,
    /// Parent edges, which may name commits absent from the model.
    pub parents: Vec<CommitId>,
    pub state: CellState,
    /// Insertion order; breaks `sort_key` ties.
    pub seq: u64,
}

impl Cell {
    pub(crate) fn new(spec: CellSpec, state: CellState, seq: u64) -> Self {
        Self {
            id: spec.id,
            sort_key: spec.sort_key,
            label: spec.label,
            parents: spec.parents,
            state,
            seq,
        }
    }

    pub fn is_visible(&self) -> bool {
        self.state == CellState::Visible
    }

    pub(crate) fn order_key(&self) -> (i64, u64) {
        (self.sort_key, self.seq)
    }
}

/// Effect of [`TreeModel::add_cell`](crate::TreeModel::add_cell).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellChange {
    /// A new cell was staged.
    Added,
    /// An existing invisible cell was staged to become visible.
    Revealed,
    /// The cell already existed; nothing staged.
    Unchanged,
}
