//! # flowprobe Logger
//!
//! Severity-tagged harness lines and tracing support. Every step outcome is
//! one [`LogLine`]; a [`LogSink`] decides where it goes.

use std::fmt;
use std::sync::{Arc, Mutex};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Severity tag carried by every harness line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Info,
    Step,
    Success,
    Warning,
    Error,
    Debug,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "INFO",
            Severity::Step => "STEP",
            Severity::Success => "SUCCESS",
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
            Severity::Debug => "DEBUG",
            Severity::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    pub severity: Severity,
    pub message: String,
    pub trace_id: String,
}

impl fmt::Display for LogLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.severity, self.message)
    }
}

/// Destination for harness lines.
pub trait LogSink: Send + Sync {
    fn emit(&self, line: &LogLine);
}

/// Forwards lines to the installed tracing subscriber.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn emit(&self, line: &LogLine) {
        let severity = line.severity.as_str();
        match line.severity {
            Severity::Info | Severity::Step | Severity::Success => {
                info!(trace_id = %line.trace_id, severity, "{}", line.message)
            }
            Severity::Warning => {
                warn!(trace_id = %line.trace_id, severity, "{}", line.message)
            }
            Severity::Error | Severity::Critical => {
                error!(trace_id = %line.trace_id, severity, "{}", line.message)
            }
            Severity::Debug => {
                debug!(trace_id = %line.trace_id, severity, "{}", line.message)
            }
        }
    }
}

/// Keeps every line in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    lines: Mutex<Vec<LogLine>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<LogLine> {
        self.lines
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.lines
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
            .filter(|line| line.severity == severity)
            .count()
    }

    pub fn messages(&self, severity: Severity) -> Vec<String> {
        self.lines
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
            .filter(|line| line.severity == severity)
            .map(|line| line.message.clone())
            .collect()
    }
}

impl LogSink for MemorySink {
    fn emit(&self, line: &LogLine) {
        self.lines
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(line.clone());
    }
}

/// Sends each line to every inner sink, in order.
#[derive(Default, Clone)]
pub struct FanoutSink {
    sinks: Vec<Arc<dyn LogSink>>,
}

impl FanoutSink {
    pub fn new(sinks: Vec<Arc<dyn LogSink>>) -> Self {
        Self { sinks }
    }
}

impl LogSink for FanoutSink {
    fn emit(&self, line: &LogLine) {
        for sink in &self.sinks {
            sink.emit(line);
        }
    }
}

/// Logger for a single flowprobe run
#[derive(Clone)]
pub struct Logger {
    pub trace_id: String,
    sink: Arc<dyn LogSink>,
}

impl Logger {
    /// Create a logger writing to tracing
    pub fn new() -> Self {
        Self::with_sink(Arc::new(TracingSink))
    }

    pub fn with_sink(sink: Arc<dyn LogSink>) -> Self {
        Self {
            trace_id: Uuid::new_v4().to_string(),
            sink,
        }
    }

    /// Same sink, different trace id
    pub fn with_trace_id(&self, trace_id: impl Into<String>) -> Self {
        Self {
            trace_id: trace_id.into(),
            sink: self.sink.clone(),
        }
    }

    /// Initialize tracing subscriber. `RUST_LOG` wins over the `info` default.
    pub fn init_tracing(json: bool) {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

        // A second init in the same process is a no-op.
        let _ = if json {
            tracing_subscriber::fmt()
                .json()
                .with_env_filter(filter)
                .try_init()
        } else {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(false)
                .try_init()
        };
    }

    pub fn log(&self, severity: Severity, message: impl Into<String>) {
        self.sink.emit(&LogLine {
            severity,
            message: message.into(),
            trace_id: self.trace_id.clone(),
        });
    }

    pub fn info(&self, message: impl Into<String>) {
        self.log(Severity::Info, message);
    }

    pub fn step(&self, message: impl Into<String>) {
        self.log(Severity::Step, message);
    }

    pub fn success(&self, message: impl Into<String>) {
        self.log(Severity::Success, message);
    }

    pub fn warn(&self, message: impl Into<String>) {
        self.log(Severity::Warning, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.log(Severity::Error, message);
    }

    pub fn debug(&self, message: impl Into<String>) {
        self.log(Severity::Debug, message);
    }

    pub fn critical(&self, message: impl Into<String>) {
        self.log(Severity::Critical, message);
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::new()
    }
}
