//! Watch Range Error Hierarchy
//!
//! Errors are split by audience:
//! - [`RangeError`] is the client-visible taxonomy carried in every response.
//! - [`WatchError`] covers registry bookkeeping that is logged, never sent.
//! - [`Error`] is the crate-wide error returned by internal operations.

use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Infrastructure-level failures (storage, serialization)
    #[error(transparent)]
    System(#[from] SystemError),

    /// Configuration loading or validation failures
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Request-level failures that are reported back to the client
    #[error(transparent)]
    Range(#[from] RangeError),

    /// Watcher registry bookkeeping failures
    #[error(transparent)]
    Watch(#[from] WatchError),
}

/// Structured error payload attached to a client response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum RangeError {
    /// This replica is not the leader of the range; the client should retry
    /// against the current leader.
    #[error("Range {range_id} is not led by this node")]
    NotLeader { range_id: u64 },

    /// The encoded key lies outside the range boundaries and the caller's
    /// epoch matches the current one.
    #[error("Key {key:?} not in range [{start:?}, {end:?})")]
    KeyNotInRange {
        key: Vec<u8>,
        start: Vec<u8>,
        end: Vec<u8>,
    },

    /// The shard has no free write capacity
    #[error("No space left for writes")]
    NoSpace,

    /// The replication layer refused the proposal before it entered the log
    #[error("Raft proposal rejected")]
    RaftFailure,

    /// Empty key or malformed request
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Stored bytes could not be decoded
    #[error("Corrupt record: {0}")]
    CorruptRecord(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl RangeError {
    /// The form handed back to the apply stream's caller. Decode failures
    /// are surfaced as `Unknown`; everything else is passed through unchanged.
    pub fn surfaced(self) -> Self {
        match self {
            RangeError::CorruptRecord(msg) => RangeError::Unknown(msg),
            other => other,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    /// Deletion raced with another notification or eviction
    #[error("Watcher for session {session_id} not found on key {key:?}")]
    WatcherNotFound { session_id: u64, key: Vec<u8> },

    /// The session transport is gone
    #[error("Session {0} is closed")]
    SessionClosed(u64),
}

#[derive(Debug, thiserror::Error)]
pub enum SystemError {
    // Storage layer
    #[error("Storage operation failed: {0}")]
    Storage(#[from] StorageError),

    //Serialization
    #[error("Serialization error: {0}")]
    Serialization(#[from] SerializationError),
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Disk I/O failures
    #[error(transparent)]
    IoError(#[from] std::io::Error),

    /// Embedded database errors
    #[error("Embedded database error: {0}")]
    DbError(String),

    /// Write rejected because the engine ran out of space
    #[error("No space left on storage engine")]
    NoSpace,
}

// Serialization is classified separately (across protocol layers and system layers)
#[derive(Debug, thiserror::Error)]
pub enum SerializationError {
    #[error("Bincode serialization failed: {0}")]
    Bincode(#[from] bincode::Error),
}

/// Wire status codes carried in every response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(i32)]
pub enum StatusCode {
    Ok = 0,
    NotFound = 1,
    Corruption = 2,
    InvalidArgument = 4,
    IoError = 5,
    NoLeftSpace = 6,
    Unknown = 99,
}

impl StatusCode {
    pub fn code(self) -> i32 {
        self as i32
    }

    pub fn is_ok(self) -> bool {
        self == StatusCode::Ok
    }
}

impl From<&StorageError> for StatusCode {
    fn from(e: &StorageError) -> Self {
        match e {
            StorageError::IoError(_) => StatusCode::IoError,
            StorageError::DbError(_) => StatusCode::IoError,
            StorageError::NoSpace => StatusCode::NoLeftSpace,
        }
    }
}

impl From<&RangeError> for StatusCode {
    fn from(e: &RangeError) -> Self {
        match e {
            RangeError::InvalidArgument(_) => StatusCode::InvalidArgument,
            RangeError::CorruptRecord(_) => StatusCode::Corruption,
            RangeError::NoSpace => StatusCode::NoLeftSpace,
            _ => StatusCode::Unknown,
        }
    }
}

impl From<&Error> for StatusCode {
    fn from(e: &Error) -> Self {
        match e {
            Error::System(SystemError::Storage(e)) => StatusCode::from(e),
            Error::System(SystemError::Serialization(_)) => StatusCode::Corruption,
            Error::Range(e) => StatusCode::from(e),
            _ => StatusCode::Unknown,
        }
    }
}

// ============== Conversion Implementations ============== //
impl From<StorageError> for Error {
    fn from(e: StorageError) -> Self {
        Error::System(SystemError::Storage(e))
    }
}

impl From<SerializationError> for Error {
    fn from(e: SerializationError) -> Self {
        Error::System(SystemError::Serialization(e))
    }
}

impl From<bincode::Error> for Error {
    fn from(e: bincode::Error) -> Self {
        Error::System(SystemError::Serialization(SerializationError::Bincode(e)))
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::System(SystemError::Storage(StorageError::IoError(e)))
    }
}

impl From<sled::Error> for Error {
    fn from(e: sled::Error) -> Self {
        Error::System(SystemError::Storage(StorageError::DbError(e.to_string())))
    }
}
