//! Asynchronous log delivery from monitored systems to a session.

use crate::output::OutputFormatter;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Severity of a participant log message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogSeverity {
    Off,
    Fatal,
    Error,
    Warning,
    Info,
    Debug,
}

impl LogSeverity {
    pub fn label(self) -> &'static str {
        match self {
            LogSeverity::Off => "Off",
            LogSeverity::Fatal => "Fatal",
            LogSeverity::Error => "Error",
            LogSeverity::Warning => "Warning",
            LogSeverity::Info => "Info",
            LogSeverity::Debug => "Debug",
        }
    }
}

/// One log message emitted by a participant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEvent {
    pub severity: LogSeverity,
    pub participant_name: String,
    pub logger_name: String,
    pub message: String,
}

/// Receiver of log events registered on a system.
///
/// Called from whatever thread the fleet delivers events on.
pub trait EventMonitor: Send + Sync {
    fn on_log(&self, event: &LogEvent);
}

/// Renders log events into a session's output.
pub struct LogMonitor {
    out: Arc<OutputFormatter>,
    structured: AtomicBool,
}

impl LogMonitor {
    pub fn new(out: Arc<OutputFormatter>, structured: bool) -> Self {
        Self {
            out,
            structured: AtomicBool::new(structured),
        }
    }

    pub fn set_structured(&self, structured: bool) {
        self.structured.store(structured, Ordering::SeqCst);
    }

    pub fn is_structured(&self) -> bool {
        self.structured.load(Ordering::SeqCst)
    }
}

impl EventMonitor for LogMonitor {
    fn on_log(&self, event: &LogEvent) {
        if self.is_structured() {
            self.out.write_value(&serde_json::json!({
                "log_type": "message",
                "severity_level": event.severity.label(),
                "participant_name": event.participant_name,
                "logger_name": event.logger_name,
                "message": event.message,
            }));
        } else {
            self.out.write(&format!(
                "    LOG [{}] {}@{} :{}\nfep> ",
                event.severity.label(),
                event.logger_name,
                event.participant_name,
                event.message
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::BufferSink;

    fn event() -> LogEvent {
        LogEvent {
            severity: LogSeverity::Warning,
            participant_name: "part_a".into(),
            logger_name: "clock".into(),
            message: "drift detected".into(),
        }
    }

    #[test]
    fn test_plain_log_line_reprints_prompt() {
        let sink = BufferSink::new();
        let out = Arc::new(OutputFormatter::new(sink.clone(), false));
        let monitor = LogMonitor::new(out, false);
        monitor.on_log(&event());
        assert_eq!(
            sink.contents(),
            "    LOG [Warning] clock@part_a :drift detected\nfep> "
        );
    }

    #[test]
    fn test_structured_log_record() {
        let sink = BufferSink::new();
        let out = Arc::new(OutputFormatter::new(sink.clone(), true));
        let monitor = LogMonitor::new(out, true);
        monitor.on_log(&event());
        assert_eq!(
            sink.contents(),
            "{\"log_type\":\"message\",\"severity_level\":\"Warning\",\"participant_name\":\"part_a\",\"logger_name\":\"clock\",\"message\":\"drift detected\"}\n"
        );
    }

    #[test]
    fn test_mode_follows_own_flag() {
        let sink = BufferSink::new();
        let out = Arc::new(OutputFormatter::new(sink.clone(), false));
        let monitor = LogMonitor::new(out, false);
        monitor.set_structured(true);
        monitor.on_log(&event());
        assert!(sink.contents().starts_with("{\"log_type\""));
    }
}
