//! Engine configuration
//!
//! Settings are layered from an optional `talos.toml` file and `TALOS_`-prefixed
//! environment variables (e.g. `TALOS_ENGINE__DEFAULT_TIMEOUT_SECONDS=30`).

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// Top-level settings for the engine
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default)]
    pub engine: EngineSettings,
    #[serde(default)]
    pub memory: MemorySettings,
}

impl Settings {
    /// Load settings from `talos.toml` and the environment
    pub fn new() -> EngineResult<Self> {
        Self::from_file("talos")
    }

    /// Load settings from a named config file (extension resolved by the
    /// config crate) and the environment
    pub fn from_file(name: &str) -> EngineResult<Self> {
        let config = Config::builder()
            .add_source(File::with_name(name).required(false))
            .add_source(Environment::with_prefix("TALOS").separator("__"))
            .build()
            .map_err(|e| EngineError::InvalidConfig(e.to_string()))?;

        config
            .try_deserialize()
            .map_err(|e| EngineError::InvalidConfig(e.to_string()))
    }
}

/// Runtime defaults for agent execution
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EngineSettings {
    /// Default run timeout when the caller does not supply one
    #[serde(default = "default_timeout_seconds")]
    pub default_timeout_seconds: u64,
    /// Capacity of each agent runner's mailbox
    #[serde(default = "default_mailbox_capacity")]
    pub mailbox_capacity: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            default_timeout_seconds: default_timeout_seconds(),
            mailbox_capacity: default_mailbox_capacity(),
        }
    }
}

fn default_timeout_seconds() -> u64 {
    120
}

fn default_mailbox_capacity() -> usize {
    64
}

/// Session memory configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MemorySettings {
    /// Storage backend type
    #[serde(default)]
    pub backend: MemoryBackend,
    /// Maximum number of events to retain per session
    #[serde(default = "default_max_events")]
    pub max_events: usize,
    /// Base directory for file-based storage
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
}

impl Default for MemorySettings {
    fn default() -> Self {
        Self {
            backend: MemoryBackend::InMemory,
            max_events: default_max_events(),
            file_path: None,
        }
    }
}

fn default_max_events() -> usize {
    1000
}

/// Session storage backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MemoryBackend {
    /// Store sessions in memory only (lost on restart)
    #[default]
    InMemory,
    /// Store sessions as JSON files
    File,
}
