use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

use parking_lot::RwLock;
use tracing::trace;

use crate::KvIter;
use crate::Result;
use crate::StorageEngine;
use crate::StorageError;

/// In-memory engine backed by an ordered map.
///
/// Writes can be switched to fail with `StorageError::NoSpace`, which lets
/// callers exercise write-failure paths without a real disk.
#[derive(Debug, Default)]
pub struct MemStorageEngine {
    data: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
    fail_writes: AtomicBool,
}

impl MemStorageEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_writes(
        &self,
        fail: bool,
    ) {
        self.fail_writes.store(fail, Ordering::Release);
    }

    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_writable(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::Acquire) {
            return Err(StorageError::NoSpace.into());
        }
        Ok(())
    }
}

impl StorageEngine for MemStorageEngine {
    fn get(
        &self,
        key: &[u8],
    ) -> Result<Option<Vec<u8>>> {
        Ok(self.data.read().get(key).cloned())
    }

    fn put(
        &self,
        key: &[u8],
        value: &[u8],
    ) -> Result<()> {
        self.check_writable()?;
        trace!(key_len = key.len(), value_len = value.len(), "mem put");
        self.data.write().insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(
        &self,
        key: &[u8],
    ) -> Result<Option<Vec<u8>>> {
        self.check_writable()?;
        Ok(self.data.write().remove(key))
    }

    fn scan(
        &self,
        start: &[u8],
        end: &[u8],
    ) -> Result<KvIter> {
        let upper = if end.is_empty() {
            Bound::Unbounded
        } else {
            Bound::Excluded(end.to_vec())
        };
        if !end.is_empty() && start >= end {
            return Ok(Box::new(std::iter::empty()));
        }
        let snapshot: Vec<_> = self
            .data
            .read()
            .range((Bound::Included(start.to_vec()), upper))
            .map(|(k, v)| Ok((k.clone(), v.clone())))
            .collect();
        Ok(Box::new(snapshot.into_iter()))
    }
}
