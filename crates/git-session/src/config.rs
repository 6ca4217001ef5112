use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, SessionError};
use crate::Result;

/// Tunables for building and polling a repository's graph.
///
/// ```toml
/// poll_interval_ms = 5000
/// max_link_passes = 3
/// include_remote = true
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GraphConfig {
    /// Delay between monitor polls.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Relink passes a build may run before reporting dangling parents.
    #[serde(default = "default_max_link_passes")]
    pub max_link_passes: usize,

    /// Show remote-only history as visible cells. When off it is still
    /// built and classified, but kept as invisible placeholders.
    #[serde(default = "default_include_remote")]
    pub include_remote: bool,
}

fn default_poll_interval_ms() -> u64 {
    5000
}

fn default_max_link_passes() -> usize {
    3
}

fn default_include_remote() -> bool {
    true
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            max_link_passes: default_max_link_passes(),
            include_remote: default_include_remote(),
        }
    }
}

impl GraphConfig {
    /// Read and validate a TOML config file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text).map_err(|source| SessionError::Config {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parse and validate TOML text. Missing keys take their defaults.
    pub fn from_toml_str(text: &str) -> std::result::Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid {
                key: "poll_interval_ms",
                reason: "must be greater than zero",
            });
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}
