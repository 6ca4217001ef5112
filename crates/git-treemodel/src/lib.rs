//! Incremental tree model.
//!
//! A renderer-facing projection of the commit graph: one [`Cell`] per commit
//! pushed into the model, each carrying its parent edges by id. Cells are
//! only ever added, and an invisible cell can only become visible.
//!
//! Writers stage changes into a pending batch; [`TreeModel::update`] applies
//! the whole batch at once by swapping in a new [`TreeSnapshot`]. Readers
//! work from a snapshot and never see a partially applied batch.

mod cell;
mod model;

pub use cell::{Cell, CellChange, CellSpec, CellState};
pub use model::{AncestrySource, TreeModel, TreeSnapshot};

pub use git_hash::CommitId;
