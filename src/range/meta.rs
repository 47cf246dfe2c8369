use serde::Deserialize;
use serde::Serialize;

use crate::codec::encode_segment;
use crate::constants::DATA_PREFIX;

/// Ownership assignment of a range: identity, boundaries and epoch.
///
/// Boundaries are encoded keys and the interval is half-open. An empty
/// `end_key` means the range extends to the end of its table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeMeta {
    pub id: u64,
    /// Namespace every key of this range is encoded under
    pub table_id: u64,
    pub start_key: Vec<u8>,
    pub end_key: Vec<u8>,
    /// Bumped whenever the boundaries change
    pub epoch: u64,
}

impl RangeMeta {
    pub fn new(
        id: u64,
        table_id: u64,
        start_key: Vec<u8>,
        end_key: Vec<u8>,
        epoch: u64,
    ) -> Self {
        Self {
            id,
            table_id,
            start_key,
            end_key,
            epoch,
        }
    }

    /// Builds a range whose boundaries are single-segment user keys.
    ///
    /// An empty `start` starts at the first key of the table; an empty `end`
    /// runs to the end of the table.
    pub fn from_user_bounds(
        id: u64,
        table_id: u64,
        start: &[u8],
        end: &[u8],
        epoch: u64,
    ) -> Self {
        let start_key = table_bound(table_id, start);
        let end_key = if end.is_empty() {
            table_end(table_id)
        } else {
            table_bound(table_id, end)
        };
        Self::new(id, table_id, start_key, end_key, epoch)
    }

    pub fn contains(
        &self,
        encoded_key: &[u8],
    ) -> bool {
        encoded_key >= self.start_key.as_slice()
            && (self.end_key.is_empty() || encoded_key < self.end_key.as_slice())
    }

    pub fn epoch_equals(
        &self,
        epoch: u64,
    ) -> bool {
        self.epoch == epoch
    }
}

fn table_bound(
    table_id: u64,
    user_key: &[u8],
) -> Vec<u8> {
    let mut buf = Vec::with_capacity(9 + user_key.len() + 9);
    buf.push(DATA_PREFIX);
    buf.extend_from_slice(&table_id.to_be_bytes());
    if !user_key.is_empty() {
        encode_segment(user_key, &mut buf);
    }
    buf
}

/// Exclusive upper bound of every key in `table_id`.
fn table_end(table_id: u64) -> Vec<u8> {
    match table_id.checked_add(1) {
        Some(next) => {
            let mut buf = Vec::with_capacity(9);
            buf.push(DATA_PREFIX);
            buf.extend_from_slice(&next.to_be_bytes());
            buf
        }
        None => vec![DATA_PREFIX + 1],
    }
}
