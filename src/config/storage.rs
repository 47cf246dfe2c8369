use std::path::PathBuf;

use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    Memory,
    Sled,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct StorageConfig {
    #[serde(default = "default_engine")]
    pub engine: EngineKind,

    /// Root directory of the sled database; unused by the memory engine
    #[serde(default = "default_db_dir")]
    pub db_root_dir: PathBuf,

    #[serde(default = "default_cache_capacity")]
    pub cache_capacity_bytes: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            engine: default_engine(),
            db_root_dir: default_db_dir(),
            cache_capacity_bytes: default_cache_capacity(),
        }
    }
}

impl StorageConfig {
    pub fn validate(&self) -> Result<()> {
        if self.engine == EngineKind::Sled && self.db_root_dir.as_os_str().is_empty() {
            return Err(Error::Config(ConfigError::Message(
                "db_root_dir is required by the sled engine".into(),
            )));
        }

        if self.cache_capacity_bytes == 0 {
            return Err(Error::Config(ConfigError::Message(
                "cache_capacity_bytes must be greater than 0".into(),
            )));
        }

        Ok(())
    }
}

fn default_engine() -> EngineKind {
    EngineKind::Memory
}
fn default_db_dir() -> PathBuf {
    PathBuf::from("./db")
}
fn default_cache_capacity() -> u64 {
    //10MB
    10 * 1024 * 1024
}
