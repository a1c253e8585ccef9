//! Dual-mode output formatter.
//!
//! Every command result is rendered through an [`OutputFormatter`], either as
//! human-readable text or as one compact JSON record per line. The formatter
//! owns the session's sink behind a mutex so that command replies and
//! asynchronous log events never interleave mid-line.

use serde_json::{Map, Value};
use std::fmt::Display;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

/// Outcome kind carried in the `status` field of every structured record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CmdStatus {
    NoError = 0,
    GenericError = 1,
    InputError = 2,
    FilesystemError = 3,
    StatechangeError = 4,
    SystemconfigError = 5,
    SystemtimingError = 6,
    ParticipantError = 7,
    RpcobjectError = 8,
}

impl CmdStatus {
    pub fn code(self) -> u8 {
        self as u8
    }
}

/// Destination for rendered output (terminal, websocket, test buffer).
pub trait OutputSink: Send {
    /// Write one complete chunk of output.
    fn write_text(&mut self, text: &str);
}

/// Writes to the process stdout and flushes after each chunk.
#[derive(Debug, Default)]
pub struct StdoutSink;

impl OutputSink for StdoutSink {
    fn write_text(&mut self, text: &str) {
        use std::io::Write;
        let mut stdout = std::io::stdout().lock();
        let _ = stdout.write_all(text.as_bytes());
        let _ = stdout.flush();
    }
}

/// Forwards each chunk to a bounded channel; used for websocket connections
/// where a single writer task owns the socket. Chunks that do not fit while
/// the client lags behind are dropped.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<String>,
    dropped: usize,
}

impl ChannelSink {
    pub fn new(tx: mpsc::Sender<String>) -> Self {
        Self { tx, dropped: 0 }
    }

    /// Chunks dropped since the queue last accepted one.
    pub fn dropped(&self) -> usize {
        self.dropped
    }
}

impl OutputSink for ChannelSink {
    fn write_text(&mut self, text: &str) {
        match self.tx.try_send(text.to_string()) {
            Ok(()) => {
                if self.dropped > 0 {
                    tracing::warn!(dropped = self.dropped, "client caught up, output was lost");
                    self.dropped = 0;
                }
            }
            Err(TrySendError::Full(_)) => {
                if self.dropped == 0 {
                    tracing::warn!("client is not reading, dropping output");
                }
                self.dropped += 1;
            }
            Err(TrySendError::Closed(_)) => {
                tracing::debug!("output dropped, connection writer is gone");
            }
        }
    }
}

/// Collects output in memory. Clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct BufferSink {
    buffer: std::sync::Arc<Mutex<String>>,
}

impl BufferSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far.
    pub fn contents(&self) -> String {
        self.buffer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Return and clear the buffer.
    pub fn take(&self) -> String {
        std::mem::take(&mut *self.buffer.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl OutputSink for BufferSink {
    fn write_text(&mut self, text: &str) {
        self.buffer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_str(text);
    }
}

/// Renders results in plain or structured mode into one sink.
pub struct OutputFormatter {
    sink: Mutex<Box<dyn OutputSink>>,
    structured: AtomicBool,
    goodbye_sent: AtomicBool,
}

impl std::fmt::Debug for OutputFormatter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutputFormatter")
            .field("structured", &self.is_structured())
            .finish()
    }
}

fn record(action: &str, status: CmdStatus) -> Map<String, Value> {
    let mut map = Map::new();
    map.insert("action".into(), Value::String(action.to_string()));
    map.insert("status".into(), Value::from(status.code()));
    map
}

impl OutputFormatter {
    pub fn new(sink: impl OutputSink + 'static, structured: bool) -> Self {
        Self {
            sink: Mutex::new(Box::new(sink)),
            structured: AtomicBool::new(structured),
            goodbye_sent: AtomicBool::new(false),
        }
    }

    pub fn is_structured(&self) -> bool {
        self.structured.load(Ordering::SeqCst)
    }

    pub fn set_structured(&self, structured: bool) {
        self.structured.store(structured, Ordering::SeqCst);
    }

    /// Write raw text as one chunk.
    pub fn write(&self, text: &str) {
        self.sink
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .write_text(text);
    }

    /// Write a JSON value as a single compact line.
    pub fn write_value(&self, value: &Value) {
        match serde_json::to_string(value) {
            Ok(json) => self.write(&format!("{json}\n")),
            Err(e) => tracing::warn!(error = %e, "failed to serialize output record"),
        }
    }

    /// Write an already assembled record (`action` and `status` first).
    pub fn write_record(&self, record: Map<String, Value>) {
        self.write_value(&Value::Object(record));
    }

    /// Start a record with `action` and `status` set.
    pub fn record(&self, action: &str, status: CmdStatus) -> Map<String, Value> {
        record(action, status)
    }

    /// Free text note.
    pub fn note(&self, action: &str, text: &str) {
        if self.is_structured() {
            let mut rec = record(action, CmdStatus::NoError);
            rec.insert("note".into(), Value::String(text.to_string()));
            self.write_record(rec);
        } else {
            self.write(&format!("{text}\n"));
        }
    }

    /// One named attribute.
    pub fn attribute(&self, action: &str, key: &str, value: &str) {
        if self.is_structured() {
            let mut rec = record(action, CmdStatus::NoError);
            rec.insert(key.to_string(), Value::String(value.to_string()));
            self.write_record(rec);
        } else {
            self.write(&format!("{key} : {value}\n"));
        }
    }

    /// Several attributes in one record; plain mode prints only the values.
    pub fn notes(&self, action: &str, attributes: &[(&str, String)]) {
        if self.is_structured() {
            let mut rec = record(action, CmdStatus::NoError);
            for (key, value) in attributes {
                rec.insert((*key).to_string(), Value::String(value.clone()));
            }
            self.write_record(rec);
        } else {
            let values: Vec<&str> = attributes.iter().map(|(_, v)| v.as_str()).collect();
            self.write(&format!("{}\n", values.join(" : ")));
        }
    }

    /// Error report; `reason` is omitted when empty.
    pub fn error(&self, action: &str, error: &str, status: CmdStatus, reason: &str) {
        if self.is_structured() {
            let mut rec = record(action, status);
            rec.insert("error".into(), Value::String(error.to_string()));
            if !reason.is_empty() {
                rec.insert("reason".into(), Value::String(reason.to_string()));
            }
            self.write_record(rec);
        } else if reason.is_empty() {
            self.write(&format!("{error}\n"));
        } else {
            self.write(&format!("{error}, error: {reason}\n"));
        }
    }

    /// Report of a failed collaborator call together with its cause.
    pub fn exception(&self, action: &str, text: &str, status: CmdStatus, cause: &dyn Display) {
        if self.is_structured() {
            let mut rec = record(action, status);
            rec.insert("exception".into(), Value::String(text.to_string()));
            rec.insert("reason".into(), Value::String(cause.to_string()));
            self.write_record(rec);
        } else {
            self.write(&format!("{text}, exception: {cause}\n"));
        }
    }

    /// Farewell written when the session ends. Only the first call writes.
    pub fn goodbye(&self) -> bool {
        if self.goodbye_sent.swap(true, Ordering::SeqCst) {
            return false;
        }
        if self.is_structured() {
            self.write_value(&serde_json::json!({ "action": "applicationShutdown" }));
        } else {
            self.write("bye\n");
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn formatter(structured: bool) -> (OutputFormatter, BufferSink) {
        let sink = BufferSink::new();
        (OutputFormatter::new(sink.clone(), structured), sink)
    }

    #[test]
    fn test_note_plain() {
        let (out, sink) = formatter(false);
        out.note("loadSystem", "demo loaded");
        assert_eq!(sink.contents(), "demo loaded\n");
    }

    #[test]
    fn test_note_structured_key_order() {
        let (out, sink) = formatter(true);
        out.note("enableJson", "json_mode: enabled");
        assert_eq!(
            sink.contents(),
            "{\"action\":\"enableJson\",\"status\":0,\"note\":\"json_mode: enabled\"}\n"
        );
    }

    #[test]
    fn test_attribute_both_modes() {
        let (out, sink) = formatter(false);
        out.attribute("getInitPriority", "priority", "3");
        assert_eq!(sink.take(), "priority : 3\n");

        out.set_structured(true);
        out.attribute("getInitPriority", "priority", "3");
        assert_eq!(
            sink.take(),
            "{\"action\":\"getInitPriority\",\"status\":0,\"priority\":\"3\"}\n"
        );
    }

    #[test]
    fn test_notes_plain_joins_values() {
        let (out, sink) = formatter(false);
        out.notes(
            "getSystemState",
            &[
                ("stateID", "6".into()),
                ("stateName", "running".into()),
                ("homogeneous", "homogeneous".into()),
            ],
        );
        assert_eq!(sink.contents(), "6 : running : homogeneous\n");
    }

    #[test]
    fn test_error_with_and_without_reason() {
        let (out, sink) = formatter(false);
        out.error("x", "failed", CmdStatus::GenericError, "");
        out.error("x", "failed", CmdStatus::GenericError, "ACCESS_DENIED");
        assert_eq!(sink.contents(), "failed\nfailed, error: ACCESS_DENIED\n");
    }

    #[test]
    fn test_error_structured_omits_empty_reason() {
        let (out, sink) = formatter(true);
        out.error("processCommandline", "bad", CmdStatus::InputError, "");
        let value: Value = serde_json::from_str(sink.contents().trim()).unwrap();
        assert_eq!(value["status"], 2);
        assert_eq!(value["error"], "bad");
        assert!(value.get("reason").is_none());
    }

    #[test]
    fn test_exception_both_modes() {
        let (out, sink) = formatter(false);
        let cause = crate::error::FleetError::Other("boom".into());
        out.exception("startSystem", "cannot start system 'a'", CmdStatus::GenericError, &cause);
        assert_eq!(sink.take(), "cannot start system 'a', exception: boom\n");

        out.set_structured(true);
        out.exception("startSystem", "cannot start system 'a'", CmdStatus::GenericError, &cause);
        assert_eq!(
            sink.take(),
            "{\"action\":\"startSystem\",\"status\":1,\"exception\":\"cannot start system 'a'\",\"reason\":\"boom\"}\n"
        );
    }

    #[test]
    fn test_goodbye_written_once() {
        let (out, sink) = formatter(false);
        assert!(out.goodbye());
        assert!(!out.goodbye());
        assert_eq!(sink.contents(), "bye\n");
    }

    #[test]
    fn test_goodbye_structured() {
        let (out, sink) = formatter(true);
        out.goodbye();
        assert_eq!(sink.contents(), "{\"action\":\"applicationShutdown\"}\n");
    }

    #[test]
    fn test_channel_sink_forwards_chunks() {
        let (tx, mut rx) = mpsc::channel(8);
        let out = OutputFormatter::new(ChannelSink::new(tx), false);
        out.note("a", "one");
        out.note("a", "two");
        assert_eq!(rx.try_recv().unwrap(), "one\n");
        assert_eq!(rx.try_recv().unwrap(), "two\n");
    }

    #[test]
    fn test_channel_sink_drops_when_full() {
        let (tx, mut rx) = mpsc::channel(2);
        let mut sink = ChannelSink::new(tx);
        for chunk in ["a", "b", "c", "d"] {
            sink.write_text(chunk);
        }
        assert_eq!(sink.dropped(), 2);
        assert_eq!(rx.try_recv().unwrap(), "a");
        assert_eq!(rx.try_recv().unwrap(), "b");
        assert!(rx.try_recv().is_err());

        sink.write_text("e");
        assert_eq!(sink.dropped(), 0);
        assert_eq!(rx.try_recv().unwrap(), "e");
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(CmdStatus::NoError.code(), 0);
        assert_eq!(CmdStatus::InputError.code(), 2);
        assert_eq!(CmdStatus::RpcobjectError.code(), 8);
    }
}
