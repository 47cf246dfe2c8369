use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// Per-replica range parameters
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RangeConfig {
    /// Identifier of the local node; stamped on every proposed command so
    /// that only the originator replies to the client
    #[serde(default = "default_node_id")]
    pub node_id: u64,

    /// Accumulated Put payload size (bytes) after which a split is requested
    #[serde(default = "default_split_check_size")]
    pub split_check_size_bytes: u64,

    /// Starting point of the range version counter; the first Put gets
    /// `initial_version + 1`
    #[serde(default)]
    pub initial_version: i64,
}

impl Default for RangeConfig {
    fn default() -> Self {
        Self {
            node_id: default_node_id(),
            split_check_size_bytes: default_split_check_size(),
            initial_version: 0,
        }
    }
}

impl RangeConfig {
    pub fn validate(&self) -> Result<()> {
        if self.node_id == 0 {
            return Err(Error::Config(ConfigError::Message(
                "node_id cannot be 0 (reserved for invalid nodes)".into(),
            )));
        }

        if self.split_check_size_bytes == 0 {
            return Err(Error::Config(ConfigError::Message(
                "split_check_size_bytes must be greater than 0".into(),
            )));
        }

        if self.initial_version < 0 {
            return Err(Error::Config(ConfigError::Message(format!(
                "initial_version must not be negative, got {}",
                self.initial_version
            ))));
        }

        Ok(())
    }
}

fn default_node_id() -> u64 {
    1
}
fn default_split_check_size() -> u64 {
    // 64MB
    64 * 1024 * 1024
}
