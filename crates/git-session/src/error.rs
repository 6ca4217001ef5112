use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Graph(#[from] git_commitgraph::GraphError),

    #[error("invalid config {}: {source}", path.display())]
    Config {
        path: PathBuf,
        #[source]
        source: ConfigError,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<git_backend::BackendError> for SessionError {
    fn from(err: git_backend::BackendError) -> Self {
        SessionError::Graph(err.into())
    }
}

/// Why a config text was rejected.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error(transparent)]
    Parse(#[from] toml::de::Error),

    #[error("{key} {reason}")]
    Invalid {
        key: &'static str,
        reason: &'static str,
    },
}
