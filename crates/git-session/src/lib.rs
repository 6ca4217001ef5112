//! Session layer: per-repository contexts wiring the backend, commit graph
//! and tree model together, the session that owns them, configuration, and
//! the background monitor that keeps a context fresh.

mod config;
mod context;
mod error;
mod monitor;
mod session;

pub use config::GraphConfig;
pub use context::RepoContext;
pub use error::{ConfigError, SessionError};
pub use monitor::{Monitor, MonitorEvent};
pub use session::Session;

pub use git_treemodel::Cell;

pub type Result<T> = std::result::Result<T, SessionError>;
