use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// Configuration for the key watcher registry
///
/// # Example
///
/// ```toml
/// [watch]
/// watcher_ttl_ms = 600000
/// eviction_interval_ms = 5000
/// max_watchers_per_key = 1024
/// ```
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct WatchConfig {
    /// Age after which a pending watcher is evicted even if it never fired.
    /// `0` keeps watchers until delivery or session close.
    #[serde(default)]
    pub watcher_ttl_ms: u64,

    /// Period of the background eviction sweep
    #[serde(default = "default_eviction_interval")]
    pub eviction_interval_ms: u64,

    /// Upper bound of sessions waiting on one key
    #[serde(default = "default_max_watchers_per_key")]
    pub max_watchers_per_key: usize,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            watcher_ttl_ms: 0,
            eviction_interval_ms: default_eviction_interval(),
            max_watchers_per_key: default_max_watchers_per_key(),
        }
    }
}

impl WatchConfig {
    pub fn validate(&self) -> Result<()> {
        if self.watcher_ttl_ms > 0 && self.eviction_interval_ms == 0 {
            return Err(Error::Config(ConfigError::Message(
                "eviction_interval_ms must be greater than 0 when watcher_ttl_ms is set".into(),
            )));
        }

        if self.max_watchers_per_key == 0 {
            return Err(Error::Config(ConfigError::Message(
                "max_watchers_per_key must be greater than 0".into(),
            )));
        }

        Ok(())
    }

    pub fn eviction_enabled(&self) -> bool {
        self.watcher_ttl_ms > 0
    }
}

fn default_eviction_interval() -> u64 {
    5_000
}
fn default_max_watchers_per_key() -> usize {
    1024
}
