//! Log entries and delivery units

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Kind of a log entry (`log`, `info`, `warn`, `error`, or any custom tag)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EntryKind {
    Log,
    Info,
    Warn,
    Error,
    Other(String),
}

impl EntryKind {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Log => "log",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
            Self::Other(tag) => tag,
        }
    }
}

impl From<&str> for EntryKind {
    fn from(tag: &str) -> Self {
        match tag {
            "log" => Self::Log,
            "info" => Self::Info,
            "warn" => Self::Warn,
            "error" => Self::Error,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<String> for EntryKind {
    fn from(tag: String) -> Self {
        Self::from(tag.as_str())
    }
}

impl From<EntryKind> for String {
    fn from(kind: EntryKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single log event
///
/// Immutable once submitted. `origin_app` is stamped by the manager with its
/// configured application name at submit time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Application that owns the manager
    #[serde(default)]
    pub origin_app: String,

    /// Producer (logger) name; also the grouping key
    pub origin_logger: String,

    /// Entry kind
    pub kind: EntryKind,

    /// Message text
    pub message: String,

    /// Numeric level
    #[serde(default)]
    pub level: i64,

    /// Captured call stack
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace: Option<String>,

    /// Wall-clock timestamp
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl LogEntry {
    /// Create an entry without trace or timestamp
    pub fn new(
        origin_logger: impl Into<String>,
        kind: impl Into<EntryKind>,
        message: impl Into<String>,
        level: i64,
    ) -> Self {
        Self {
            origin_app: String::new(),
            origin_logger: origin_logger.into(),
            kind: kind.into(),
            message: message.into(),
            level,
            trace: None,
            timestamp: None,
        }
    }

    pub fn with_app(mut self, app: impl Into<String>) -> Self {
        self.origin_app = app.into();
        self
    }

    pub fn with_trace(mut self, trace: impl Into<String>) -> Self {
        self.trace = Some(trace.into());
        self
    }

    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = Some(timestamp.into());
        self
    }

    /// Two-part namespace of the entry's origin
    pub fn namespace(&self) -> Namespace {
        Namespace {
            app: self.origin_app.clone(),
            logger: self.origin_logger.clone(),
        }
    }
}

/// Full producer namespace: application + logger
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Namespace {
    pub app: String,
    pub logger: String,
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.app, self.logger)
    }
}

/// The smallest deliverable item
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Unit {
    /// A log entry
    Entry(Arc<LogEntry>),
    /// Opening bracket of a named group
    GroupOpen { name: String },
    /// Closing bracket of the innermost open group
    GroupEnd,
}

impl Unit {
    pub fn entry(entry: LogEntry) -> Self {
        Self::Entry(Arc::new(entry))
    }

    pub fn group_open(name: impl Into<String>) -> Self {
        Self::GroupOpen { name: name.into() }
    }

    /// Short label for logs and metrics
    pub fn label(&self) -> &'static str {
        match self {
            Self::Entry(_) => "entry",
            Self::GroupOpen { .. } => "group",
            Self::GroupEnd => "group_end",
        }
    }
}
