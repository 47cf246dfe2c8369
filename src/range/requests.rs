//! Client request handlers. Each handler sends exactly one terminal
//! response through the session: reads answer directly, writes answer from
//! the apply stream once the command commits, or directly if it never
//! enters the log.

use std::sync::Arc;
use std::time::Instant;

use tracing::debug;
use tracing::error;
use tracing::warn;

use super::Range;
use super::RequestPath;
use crate::metrics::observe_store_latency;
use crate::prefix_end;
use crate::Command;
use crate::CommandType;
use crate::EventType;
use crate::FunctionKind;
use crate::KeyCodec;
use crate::PendingReply;
use crate::PureGetRequest;
use crate::RangeError;
use crate::RangeMeta;
use crate::RequestHeader;
use crate::ResponseKind;
use crate::Session;
use crate::StatusCode;
use crate::WatchDeleteRequest;
use crate::WatchGetRequest;
use crate::WatchKeyValue;
use crate::WatchPutRequest;
use crate::WatchResponse;

impl Range {
    /// Reads a key and, unless the stored version is already newer than
    /// `start_version`, leaves a one-shot watcher on it.
    ///
    /// The read, the registration and the reply happen with the key held in
    /// the registry, so a write applied concurrently is either part of the
    /// reply or notified after it.
    pub fn watch_get(
        &self,
        session: Arc<dyn Session>,
        req: WatchGetRequest,
    ) {
        let meta = self.meta();
        debug!(range_id = meta.id, session_id = session.id(), "WatchGet begin");
        let resp = WatchResponse::new(ResponseKind::WatchGet, &req.header, meta.id, session.id());

        let key = match self.admission(&meta).admit(RequestPath::Read, &req.header, &req.kv) {
            Ok(key) => key,
            Err(e) => return reply_error(session.as_ref(), resp, e, "WatchGet"),
        };

        self.registry().watch_key(
            &key,
            session.clone(),
            || match self.read_record(&meta, &key, resp) {
                Ok((resp, version)) if version > req.start_version => {
                    debug!(
                        range_id = meta.id,
                        session_id = session.id(),
                        version,
                        start_version = req.start_version,
                        "client is behind, no watch registered"
                    );
                    (false, resp)
                }
                Ok((resp, _)) => (true, resp),
                Err(resp) => (false, resp),
            },
            |resp, _registered| send(session.as_ref(), resp),
        );
    }

    /// Adds the current record of `key` to `resp` as a Put event, with
    /// `NotFound` for a never-written key. Failures come back as the error
    /// response to send instead.
    fn read_record(
        &self,
        meta: &RangeMeta,
        key: &[u8],
        resp: WatchResponse,
    ) -> std::result::Result<(WatchResponse, i64), WatchResponse> {
        let (code, stored) = match self.read(key) {
            Ok(Some(value)) => (StatusCode::Ok, value),
            Ok(None) => (StatusCode::NotFound, Vec::new()),
            Err(code) => return Err(resp.with_code(code)),
        };

        match KeyCodec::decode(FunctionKind::WatchGet, meta, key, &stored) {
            Ok(kv) => {
                let version = kv.version;
                let mut resp = resp.with_code(code);
                resp.push_event(EventType::Put, kv);
                Ok((resp, version))
            }
            Err(e) => {
                warn!(range_id = meta.id, session_id = resp.watch_id, "WatchGet error: {}", e);
                Err(resp.with_error(e))
            }
        }
    }

    /// Plain read of one key, or of every key sharing the request's
    /// leading segments when `prefix` is set.
    pub fn pure_get(
        &self,
        session: Arc<dyn Session>,
        req: PureGetRequest,
    ) {
        let meta = self.meta();
        debug!(range_id = meta.id, session_id = session.id(), prefix = req.prefix, "PureGet begin");
        let mut resp = WatchResponse::new(ResponseKind::PureGet, &req.header, meta.id, session.id());

        let key = match self.admission(&meta).admit(RequestPath::Read, &req.header, &req.kv) {
            Ok(key) => key,
            Err(e) => return reply_error(session.as_ref(), resp, e, "PureGet"),
        };

        if req.prefix {
            match self.scan_prefix(&meta, &key) {
                Ok(records) => {
                    debug!(range_id = meta.id, records = records.len(), "PureGet prefix scan");
                    for kv in records {
                        resp.push_event(EventType::Put, kv);
                    }
                }
                Err(ScanError::Storage(code)) => return send(session.as_ref(), resp.with_code(code)),
                Err(ScanError::Range(e)) => return reply_error(session.as_ref(), resp, e, "PureGet"),
            }
            return send(session.as_ref(), resp);
        }

        match self.read(&key) {
            Ok(Some(value)) => match KeyCodec::decode(FunctionKind::PureGet, &meta, &key, &value) {
                Ok(kv) => resp.push_event(EventType::Put, kv),
                Err(e) => return reply_error(session.as_ref(), resp, e, "PureGet"),
            },
            Ok(None) => resp = resp.with_code(StatusCode::NotFound),
            Err(code) => resp = resp.with_code(code),
        }
        send(session.as_ref(), resp);
    }

    /// Assigns the next version and proposes the write. The reply comes
    /// from the apply stream.
    pub fn watch_put(
        &self,
        session: Arc<dyn Session>,
        req: WatchPutRequest,
    ) {
        let meta = self.meta();
        debug!(range_id = meta.id, session_id = session.id(), "WatchPut begin");
        let resp = WatchResponse::new(ResponseKind::WatchPut, &req.header, meta.id, session.id());

        if let Err(e) = self.admission(&meta).admit(RequestPath::Write, &req.header, &req.kv) {
            return reply_error(session.as_ref(), resp, e, "WatchPut");
        }

        let mut kv = req.kv;
        let _ordered = self.propose_lock.lock();
        kv.version = self.next_version();
        debug!(range_id = meta.id, version = kv.version, "WatchPut version assigned");

        self.submit(session, resp, &meta, CommandType::WatchPut, kv);
    }

    /// Proposes the removal of a key. The reply comes from the apply stream.
    pub fn watch_delete(
        &self,
        session: Arc<dyn Session>,
        req: WatchDeleteRequest,
    ) {
        let meta = self.meta();
        debug!(range_id = meta.id, session_id = session.id(), "WatchDelete begin");
        let resp = WatchResponse::new(ResponseKind::WatchDelete, &req.header, meta.id, session.id());

        if let Err(e) = self.admission(&meta).admit(RequestPath::Write, &req.header, &req.kv) {
            return reply_error(session.as_ref(), resp, e, "WatchDelete");
        }

        self.submit(session, resp, &meta, CommandType::WatchDelete, req.kv);
    }

    fn submit(
        &self,
        session: Arc<dyn Session>,
        resp: WatchResponse,
        meta: &RangeMeta,
        cmd_type: CommandType,
        kv: WatchKeyValue,
    ) {
        let kind = match cmd_type {
            CommandType::WatchPut => FunctionKind::WatchPut,
            CommandType::WatchDelete => FunctionKind::WatchDelete,
        };
        let (key, value) = match KeyCodec::encode(kind, meta, &kv) {
            Ok(encoded) => encoded,
            Err(e) => return reply_error(session.as_ref(), resp, e, cmd_type.as_str()),
        };

        let command = Command {
            id: self.pipeline.next_command_id(),
            cmd_type,
            range_id: meta.id,
            key,
            value,
        };
        let waiting = PendingReply {
            session: session.clone(),
            kind: resp.kind,
            header: RequestHeader {
                range_id: resp.header.range_id,
                range_epoch: resp.header.range_epoch,
            },
        };

        if !self.pipeline.propose(command, waiting) {
            reply_error(session.as_ref(), resp, RangeError::RaftFailure, cmd_type.as_str());
        }
    }

    /// Point read; storage failures are mapped to the status code sent back.
    fn read(
        &self,
        key: &[u8],
    ) -> std::result::Result<Option<Vec<u8>>, StatusCode> {
        let start = Instant::now();
        let result = self.storage.get(key);
        observe_store_latency("get", start);
        result.map_err(|e| {
            error!(range_id = self.id(), "storage get failed: {}", e);
            StatusCode::from(&e)
        })
    }

    fn scan_prefix(
        &self,
        meta: &RangeMeta,
        prefix: &[u8],
    ) -> std::result::Result<Vec<WatchKeyValue>, ScanError> {
        let (start, end) = clip_to_range(meta, prefix);
        let started = Instant::now();
        let iter = self.storage.scan(&start, &end).map_err(|e| {
            error!(range_id = meta.id, "storage scan failed: {}", e);
            ScanError::Storage(StatusCode::from(&e))
        })?;

        let mut records = Vec::new();
        for item in iter {
            let (key, value) = item.map_err(|e| {
                error!(range_id = meta.id, "storage scan failed: {}", e);
                ScanError::Storage(StatusCode::from(&e))
            })?;
            let kv = KeyCodec::decode(FunctionKind::PureGet, meta, &key, &value).map_err(ScanError::Range)?;
            records.push(kv);
        }
        observe_store_latency("scan", started);
        Ok(records)
    }
}

enum ScanError {
    Storage(StatusCode),
    Range(RangeError),
}

/// `[prefix, prefix_end(prefix))` intersected with the range boundaries.
fn clip_to_range(
    meta: &RangeMeta,
    prefix: &[u8],
) -> (Vec<u8>, Vec<u8>) {
    let start = if prefix < meta.start_key.as_slice() {
        meta.start_key.clone()
    } else {
        prefix.to_vec()
    };

    let mut end = prefix_end(prefix);
    if !meta.end_key.is_empty() && (end.is_empty() || meta.end_key < end) {
        end = meta.end_key.clone();
    }
    (start, end)
}

fn reply_error(
    session: &dyn Session,
    resp: WatchResponse,
    err: RangeError,
    op: &str,
) {
    warn!(range_id = resp.header.range_id, session_id = session.id(), "{} error: {}", op, err);
    send(session, resp.with_error(err));
}

fn send(
    session: &dyn Session,
    resp: WatchResponse,
) {
    if let Err(e) = session.send(resp) {
        warn!(session_id = session.id(), "response not delivered: {}", e);
    }
}
