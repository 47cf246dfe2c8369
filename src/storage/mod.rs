//! Durable key-value engine contract and its adaptors.
//!
//! The range only needs point reads/writes and bounded scans; the engine
//! owns its own consistency and durability.
mod adaptors;
mod storage_engine;


pub use adaptors::*;
pub use storage_engine::*;

use std::sync::Arc;

use tracing::debug;

use crate::EngineKind;
use crate::Result;
use crate::StorageConfig;

/// Opens the engine selected in `config` for range `range_id`.
pub fn open_storage_engine(
    config: &StorageConfig,
    range_id: u64,
) -> Result<Arc<dyn StorageEngine>> {
    debug!(engine = ?config.engine, range_id, "open_storage_engine");
    match config.engine {
        EngineKind::Memory => Ok(Arc::new(MemStorageEngine::new())),
        EngineKind::Sled => {
            let db = init_sled_range_db(&config.db_root_dir, config.cache_capacity_bytes)?;
            Ok(Arc::new(SledStorageEngine::new(&db, range_id)?))
        }
    }
}
