// -
// Encoding layout

/// First byte of every encoded data key
pub(crate) const DATA_PREFIX: u8 = 0x01;

/// First byte of every encoded value
pub(crate) const VALUE_MAGIC: u8 = 0x57;

/// magic(1) + version(8) + ext_len(4)
pub(crate) const VALUE_HEADER_LEN: usize = 1 + 8 + 4;

/// Group size of the order-preserving segment encoding
pub(crate) const SEGMENT_GROUP_SIZE: usize = 8;

/// Marker byte for a full group that is followed by more data
pub(crate) const SEGMENT_GROUP_MARKER: u8 = 0xFF;

/// Version of a key that has never been written
pub const ZERO_VERSION: i64 = 0;

// -
// Database namespaces

/// Sled tree prefix; the range id is appended
pub(crate) const RANGE_DATA_TREE_PREFIX: &str = "_range_data_";

// -
// Config

pub(crate) const CONFIG_ENV_PREFIX: &str = "WATCH_RANGE";
pub(crate) const CONFIG_PATH_ENV: &str = "CONFIG_PATH";
