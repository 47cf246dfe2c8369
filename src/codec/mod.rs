//! Storage representation of watch records.
//!
//! Encoded key: `DATA_PREFIX(1) ++ table_id(8, BE) ++ segment*`, where each
//! key segment uses an order-preserving group encoding: groups of 8 bytes
//! followed by a marker byte (`0xFF` when more groups follow, `0xFF - pad`
//! for the last group). Two properties follow:
//! - byte order of encoded keys equals the order of the logical keys, so
//!   range boundaries can be compared on encoded bytes;
//! - the encoding of a segment list is a byte prefix of the encoding of any
//!   longer list with the same leading segments, which is what prefix reads
//!   scan for.
//!
//! Encoded value: `VALUE_MAGIC(1) ++ version(i64, BE) ++ ext_len(u32, BE) ++
//! ext ++ value`. The version therefore travels with the value and a read
//! recovers it without a side index.

mod segment;


pub(crate) use segment::decode_segments;
pub(crate) use segment::encode_segment;

use crate::constants::DATA_PREFIX;
use crate::constants::VALUE_HEADER_LEN;
use crate::constants::VALUE_MAGIC;
use crate::constants::ZERO_VERSION;
use crate::RangeError;
use crate::RangeMeta;
use crate::WatchKeyValue;

/// Operation an encoding is produced for. Each kind has its own version rule:
/// - `WatchPut` writes the freshly assigned version;
/// - `WatchGet`/`PureGet` surface whatever version is stored;
/// - `WatchDelete` carries the version being removed and no payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionKind {
    WatchGet,
    PureGet,
    WatchPut,
    WatchDelete,
}

/// Stateless encoder/decoder bound to a range's table identity.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyCodec;

impl KeyCodec {
    /// Encodes the key part only. Used by reads and by prefix scans.
    pub fn encode_key(
        meta: &RangeMeta,
        kv: &WatchKeyValue,
    ) -> Result<Vec<u8>, RangeError> {
        if kv.key_is_empty() {
            return Err(RangeError::InvalidArgument("key is empty".into()));
        }
        let payload: usize = kv.key.iter().map(|s| (s.len() / 8 + 1) * 9).sum();
        let mut buf = Vec::with_capacity(1 + 8 + payload);
        buf.push(DATA_PREFIX);
        buf.extend_from_slice(&meta.table_id.to_be_bytes());
        for segment in &kv.key {
            encode_segment(segment, &mut buf);
        }
        Ok(buf)
    }

    pub fn encode(
        kind: FunctionKind,
        meta: &RangeMeta,
        kv: &WatchKeyValue,
    ) -> Result<(Vec<u8>, Vec<u8>), RangeError> {
        let key = Self::encode_key(meta, kv)?;
        let value = match kind {
            FunctionKind::WatchPut => {
                if kv.version <= ZERO_VERSION {
                    return Err(RangeError::InvalidArgument(format!(
                        "put requires an assigned version, got {}",
                        kv.version
                    )));
                }
                encode_value(kv.version, &kv.ext, &kv.value)
            }
            FunctionKind::WatchDelete => encode_value(kv.version, &kv.ext, &[]),
            FunctionKind::WatchGet | FunctionKind::PureGet => {
                encode_value(kv.version, &kv.ext, &kv.value)
            }
        };
        Ok((key, value))
    }

    /// Decodes a stored record. An empty `value` is the never-written sentinel
    /// and yields version `0`; malformed bytes yield `CorruptRecord`.
    pub fn decode(
        kind: FunctionKind,
        meta: &RangeMeta,
        key: &[u8],
        value: &[u8],
    ) -> Result<WatchKeyValue, RangeError> {
        let segments = Self::decode_key(meta, key)?;
        let mut kv = WatchKeyValue::with_segments(segments);
        if value.is_empty() {
            kv.version = ZERO_VERSION;
            return Ok(kv);
        }

        let (version, ext, payload) = decode_value(value)?;
        kv.version = version;
        kv.ext = ext.to_vec();
        if kind != FunctionKind::WatchDelete {
            kv.value = payload.to_vec();
        }
        Ok(kv)
    }

    pub fn decode_key(
        meta: &RangeMeta,
        key: &[u8],
    ) -> Result<Vec<Vec<u8>>, RangeError> {
        if key.len() < 9 || key[0] != DATA_PREFIX {
            return Err(RangeError::CorruptRecord("missing data key prefix".into()));
        }
        let mut table = [0u8; 8];
        table.copy_from_slice(&key[1..9]);
        let table_id = u64::from_be_bytes(table);
        if table_id != meta.table_id {
            return Err(RangeError::CorruptRecord(format!(
                "key belongs to table {}, range serves table {}",
                table_id, meta.table_id
            )));
        }
        decode_segments(&key[9..])
    }

    /// Version stored in an encoded value, `0` for the absent sentinel.
    pub fn stored_version(value: &[u8]) -> Result<i64, RangeError> {
        if value.is_empty() {
            return Ok(ZERO_VERSION);
        }
        decode_value(value).map(|(version, _, _)| version)
    }
}

fn encode_value(
    version: i64,
    ext: &[u8],
    value: &[u8],
) -> Vec<u8> {
    let mut buf = Vec::with_capacity(VALUE_HEADER_LEN + ext.len() + value.len());
    buf.push(VALUE_MAGIC);
    buf.extend_from_slice(&version.to_be_bytes());
    buf.extend_from_slice(&(ext.len() as u32).to_be_bytes());
    buf.extend_from_slice(ext);
    buf.extend_from_slice(value);
    buf
}

fn decode_value(value: &[u8]) -> Result<(i64, &[u8], &[u8]), RangeError> {
    if value.len() < VALUE_HEADER_LEN {
        return Err(RangeError::CorruptRecord(format!(
            "value too short: {} bytes",
            value.len()
        )));
    }
    if value[0] != VALUE_MAGIC {
        return Err(RangeError::CorruptRecord(format!(
            "bad value magic {:#04x}",
            value[0]
        )));
    }
    let mut version = [0u8; 8];
    version.copy_from_slice(&value[1..9]);
    let mut ext_len = [0u8; 4];
    ext_len.copy_from_slice(&value[9..13]);
    let ext_len = u32::from_be_bytes(ext_len) as usize;

    let rest = &value[VALUE_HEADER_LEN..];
    if rest.len() < ext_len {
        return Err(RangeError::CorruptRecord(format!(
            "ext length {} exceeds remaining {} bytes",
            ext_len,
            rest.len()
        )));
    }
    let (ext, payload) = rest.split_at(ext_len);
    Ok((i64::from_be_bytes(version), ext, payload))
}
