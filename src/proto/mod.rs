//! Request, response and event types exchanged with clients.
//!
//! The transport layer owns the wire framing; these are the logical messages
//! a session carries. All types are serde-serialisable so a transport can
//! pick its own codec.

use serde::Deserialize;
use serde::Serialize;

use crate::RangeError;
use crate::SessionId;
use crate::StatusCode;

/// Logical record exchanged with clients.
///
/// `key` is a list of segments; a watch or point read addresses the full
/// list, a prefix read addresses every key sharing the leading segments.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WatchKeyValue {
    pub key: Vec<Vec<u8>>,
    pub value: Vec<u8>,
    /// Assigned by the range when a Put is admitted; `0` means never written
    pub version: i64,
    /// Optional extra/TTL payload stored alongside the value
    pub ext: Vec<u8>,
}

impl WatchKeyValue {
    pub fn new(
        key: impl Into<Vec<u8>>,
        value: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            key: vec![key.into()],
            value: value.into(),
            version: 0,
            ext: Vec::new(),
        }
    }

    pub fn with_segments(segments: Vec<Vec<u8>>) -> Self {
        Self {
            key: segments,
            ..Default::default()
        }
    }

    /// No segment or only empty segments
    pub fn key_is_empty(&self) -> bool {
        self.key.iter().all(|s| s.is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventType {
    /// Key was inserted or updated
    Put,
    /// Key was explicitly deleted
    Delete,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchEvent {
    pub event_type: EventType,
    pub kv: WatchKeyValue,
}

/// Routing metadata the client attaches to every request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RequestHeader {
    pub range_id: u64,
    /// Epoch of the range boundaries the client routed with
    pub range_epoch: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchGetRequest {
    pub header: RequestHeader,
    pub kv: WatchKeyValue,
    /// Latest version the client has already seen
    pub start_version: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PureGetRequest {
    pub header: RequestHeader,
    pub kv: WatchKeyValue,
    pub prefix: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchPutRequest {
    pub header: RequestHeader,
    pub kv: WatchKeyValue,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchDeleteRequest {
    pub header: RequestHeader,
    pub kv: WatchKeyValue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResponseKind {
    WatchGet,
    PureGet,
    WatchPut,
    WatchDelete,
    /// Asynchronous push for a registered watcher
    Notify,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseHeader {
    pub range_id: u64,
    /// Echo of the caller's epoch
    pub range_epoch: u64,
    pub error: Option<RangeError>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchResponse {
    pub kind: ResponseKind,
    pub header: ResponseHeader,
    /// Session the response is addressed to; doubles as the watch id
    pub watch_id: SessionId,
    pub code: i32,
    pub events: Vec<WatchEvent>,
}

impl WatchResponse {
    pub fn new(
        kind: ResponseKind,
        header: &RequestHeader,
        range_id: u64,
        watch_id: SessionId,
    ) -> Self {
        Self {
            kind,
            header: ResponseHeader {
                range_id,
                range_epoch: header.range_epoch,
                error: None,
            },
            watch_id,
            code: StatusCode::Ok.code(),
            events: Vec::new(),
        }
    }

    pub fn with_code(
        mut self,
        code: StatusCode,
    ) -> Self {
        self.code = code.code();
        self
    }

    /// Attaches a structured error; the status code follows the error.
    pub fn with_error(
        mut self,
        err: RangeError,
    ) -> Self {
        self.code = StatusCode::from(&err).code();
        self.header.error = Some(err);
        self
    }

    pub fn push_event(
        &mut self,
        event_type: EventType,
        kv: WatchKeyValue,
    ) {
        self.events.push(WatchEvent { event_type, kv });
    }

    pub fn error(&self) -> Option<&RangeError> {
        self.header.error.as_ref()
    }

    pub fn is_ok(&self) -> bool {
        self.header.error.is_none() && self.code == StatusCode::Ok.code()
    }
}
