#[cfg(test)]
use mockall::automock;

use crate::Result;

/// Owned key/value pair yielded by scans
pub type KvPair = (Vec<u8>, Vec<u8>);

/// Scan cursor over `[start, end)` in key order.
pub type KvIter = Box<dyn Iterator<Item = Result<KvPair>> + Send>;

#[cfg_attr(test, automock)]
pub trait StorageEngine: Send + Sync + 'static {
    /// Point read; `None` when the key was never written or was deleted
    fn get(
        &self,
        key: &[u8],
    ) -> Result<Option<Vec<u8>>>;

    fn put(
        &self,
        key: &[u8],
        value: &[u8],
    ) -> Result<()>;

    /// Removes `key` and returns the value it held, `None` if absent
    fn delete(
        &self,
        key: &[u8],
    ) -> Result<Option<Vec<u8>>>;

    /// Iterates `[start, end)`; an empty `end` is unbounded
    fn scan(
        &self,
        start: &[u8],
        end: &[u8],
    ) -> Result<KvIter>;
}

/// Smallest key strictly greater than every key starting with `prefix`.
///
/// Returns an empty vector (unbounded) when no such key exists.
pub fn prefix_end(prefix: &[u8]) -> Vec<u8> {
    let mut end = prefix.to_vec();
    while let Some(last) = end.pop() {
        if last < u8::MAX {
            end.push(last + 1);
            return end;
        }
    }
    Vec::new()
}
