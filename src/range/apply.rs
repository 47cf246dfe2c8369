use std::time::Instant;

use tracing::debug;
use tracing::error;
use tracing::warn;

use crate::metrics::observe_store_latency;
use crate::Command;
use crate::CommandType;
use crate::ConsensusPipeline;
use crate::EventType;
use crate::FunctionKind;
use crate::KeyCodec;
use crate::NotificationFanout;
use crate::PendingReply;
use crate::RangeError;
use crate::RangeHost;
use crate::RangeMeta;
use crate::StatusCode;
use crate::StorageEngine;
use crate::WatchResponse;
use crate::APPLIED_COMMANDS;

/// What a command did to storage on this replica.
#[derive(Debug)]
struct Applied {
    code: StatusCode,
    /// Event to fan out; `None` when the key did not change
    event: Option<EventType>,
    /// Value removed by a Delete, carrying the version it reports
    removed: Option<Vec<u8>>,
}

/// Applies committed commands to one replica's storage.
///
/// Runs on every replica in log order. Only the replica that originated a
/// command replies to its client; every replica notifies its own watchers.
pub struct ApplyEngine<'a> {
    meta: &'a RangeMeta,
    storage: &'a dyn StorageEngine,
    host: &'a dyn RangeHost,
    pipeline: &'a ConsensusPipeline,
    fanout: &'a NotificationFanout,
}

impl<'a> ApplyEngine<'a> {
    pub fn new(
        meta: &'a RangeMeta,
        storage: &'a dyn StorageEngine,
        host: &'a dyn RangeHost,
        pipeline: &'a ConsensusPipeline,
        fanout: &'a NotificationFanout,
    ) -> Self {
        Self {
            meta,
            storage,
            host,
            pipeline,
            fanout,
        }
    }

    /// Applies `command`. Storage failures are reported through the status
    /// code and never retried; `Err` means the command was aborted before
    /// touching storage.
    pub fn apply(
        &self,
        command: Command,
    ) -> std::result::Result<StatusCode, RangeError> {
        let cmd_type = command.cmd_type;
        debug!(range_id = self.meta.id, id = ?command.id, cmd_type = cmd_type.as_str(), "apply");

        let result = self.execute(&command);
        let outcome = match &result {
            Ok(applied) if applied.code.is_ok() => "ok",
            Ok(applied) if applied.code == StatusCode::NotFound => "not_found",
            Ok(_) => "storage_error",
            Err(_) => "aborted",
        };
        APPLIED_COMMANDS
            .with_label_values(&[cmd_type.as_str(), outcome])
            .inc();

        if let Some(pending) = self.pipeline.take_pending(&command.id) {
            if cmd_type == CommandType::WatchPut && matches!(&result, Ok(a) if a.code.is_ok()) {
                self.host.check_split(self.meta.id, command.payload_size());
            }
            self.reply(pending, &command, &result);
        } else if self.pipeline.is_local(&command.id) {
            warn!(range_id = self.meta.id, id = ?command.id, "no waiting session for local command");
        }

        let applied = result?;
        if let Some(event_type) = applied.event {
            let value = match event_type {
                EventType::Put => command.value.as_slice(),
                EventType::Delete => applied.removed.as_deref().unwrap_or_default(),
            };
            if let Err(e) = self.fanout.notify(self.meta, event_type, &command.key, value) {
                warn!(range_id = self.meta.id, id = ?command.id, "notify failed: {}", e);
            }
        }
        Ok(applied.code)
    }

    fn execute(
        &self,
        command: &Command,
    ) -> std::result::Result<Applied, RangeError> {
        // Boundaries may have moved since admission.
        if !self.meta.contains(&command.key) {
            warn!(
                range_id = self.meta.id,
                id = ?command.id,
                epoch = self.meta.epoch,
                "committed key no longer in range"
            );
            return Err(RangeError::KeyNotInRange {
                key: command.key.clone(),
                start: self.meta.start_key.clone(),
                end: self.meta.end_key.clone(),
            });
        }

        match command.cmd_type {
            CommandType::WatchPut => {
                let start = Instant::now();
                let result = self.storage.put(&command.key, &command.value);
                observe_store_latency("put", start);
                match result {
                    Ok(()) => Ok(Applied {
                        code: StatusCode::Ok,
                        event: Some(EventType::Put),
                        removed: None,
                    }),
                    Err(e) => {
                        error!(range_id = self.meta.id, id = ?command.id, "storage put failed: {}", e);
                        Ok(Applied {
                            code: StatusCode::from(&e),
                            event: None,
                            removed: None,
                        })
                    }
                }
            }
            CommandType::WatchDelete => {
                let start = Instant::now();
                let result = self.storage.delete(&command.key);
                observe_store_latency("delete", start);
                match result {
                    Ok(Some(previous)) => Ok(Applied {
                        code: StatusCode::Ok,
                        event: Some(EventType::Delete),
                        removed: Some(previous),
                    }),
                    Ok(None) => {
                        debug!(range_id = self.meta.id, id = ?command.id, "delete of absent key");
                        Ok(Applied {
                            code: StatusCode::NotFound,
                            event: None,
                            removed: None,
                        })
                    }
                    Err(e) => {
                        error!(range_id = self.meta.id, id = ?command.id, "storage delete failed: {}", e);
                        Ok(Applied {
                            code: StatusCode::from(&e),
                            event: None,
                            removed: None,
                        })
                    }
                }
            }
        }
    }

    fn reply(
        &self,
        pending: PendingReply,
        command: &Command,
        result: &std::result::Result<Applied, RangeError>,
    ) {
        let mut resp = WatchResponse::new(pending.kind, &pending.header, self.meta.id, pending.session.id());
        match result {
            Ok(applied) => {
                resp = resp.with_code(applied.code);
                if command.cmd_type == CommandType::WatchPut && applied.code.is_ok() {
                    match KeyCodec::decode(FunctionKind::WatchPut, self.meta, &command.key, &command.value) {
                        Ok(kv) => resp.push_event(EventType::Put, kv),
                        Err(e) => warn!(range_id = self.meta.id, "decode put reply: {}", e),
                    }
                }
            }
            Err(e) => resp = resp.with_error(e.clone()),
        }

        if let Err(e) = pending.session.send(resp) {
            warn!(range_id = self.meta.id, id = ?command.id, "reply not delivered: {}", e);
        }
    }
}
