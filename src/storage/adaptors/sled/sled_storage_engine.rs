//! Sled-backed engine: one tree per range.

use std::path::Path;

use tracing::debug;
use tracing::error;
use tracing::warn;

use crate::constants::RANGE_DATA_TREE_PREFIX;
use crate::KvIter;
use crate::Result;
use crate::StorageEngine;
use crate::StorageError;

pub fn init_sled_range_db(
    sled_db_root_path: impl AsRef<Path> + std::fmt::Debug,
    cache_capacity: u64,
) -> std::result::Result<sled::Db, std::io::Error> {
    debug!("init_sled_range_db from path: {:?}", &sled_db_root_path);

    let range_db_path = sled_db_root_path.as_ref().join("range_data");

    sled::Config::default()
        .path(&range_db_path)
        .cache_capacity(cache_capacity)
        .flush_every_ms(Some(3))
        .use_compression(true)
        .compression_factor(1)
        .open()
        .map_err(|e| {
            warn!(
                "Try to open DB at this location: {:?} and failed: {:?}",
                range_db_path, e
            );
            std::io::Error::other(e)
        })
}

#[derive(Debug, Clone)]
pub struct SledStorageEngine {
    tree: sled::Tree,
}

impl SledStorageEngine {
    pub fn new(
        db: &sled::Db,
        range_id: u64,
    ) -> Result<Self> {
        let tree = db.open_tree(format!("{}{}", RANGE_DATA_TREE_PREFIX, range_id))?;
        Ok(Self { tree })
    }
}

fn db_error(
    op: &str,
    e: sled::Error,
) -> crate::Error {
    error!("sled {} failed: {}", op, e);
    StorageError::DbError(e.to_string()).into()
}

impl StorageEngine for SledStorageEngine {
    fn get(
        &self,
        key: &[u8],
    ) -> Result<Option<Vec<u8>>> {
        self.tree
            .get(key)
            .map(|v| v.map(|v| v.to_vec()))
            .map_err(|e| db_error("get", e))
    }

    fn put(
        &self,
        key: &[u8],
        value: &[u8],
    ) -> Result<()> {
        self.tree.insert(key, value).map_err(|e| db_error("insert", e))?;
        Ok(())
    }

    fn delete(
        &self,
        key: &[u8],
    ) -> Result<Option<Vec<u8>>> {
        self.tree
            .remove(key)
            .map(|v| v.map(|v| v.to_vec()))
            .map_err(|e| db_error("remove", e))
    }

    fn scan(
        &self,
        start: &[u8],
        end: &[u8],
    ) -> Result<KvIter> {
        let iter = if end.is_empty() {
            self.tree.range(start.to_vec()..)
        } else if start >= end {
            return Ok(Box::new(std::iter::empty()));
        } else {
            self.tree.range(start.to_vec()..end.to_vec())
        };
        Ok(Box::new(iter.map(|item| {
            item.map(|(k, v)| (k.to_vec(), v.to_vec()))
                .map_err(|e| db_error("scan", e))
        })))
    }
}
