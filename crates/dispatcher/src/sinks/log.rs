//! TracingBackend - re-emits entries as tracing events

use contracts::{Backend, Completion, ContractError, EntryKind, LogEntry};
use tracing::{debug, error, info, trace, warn};

/// Backend forwarding entries to the installed tracing subscriber
///
/// The event level follows the entry kind: `log` maps to debug, unknown
/// kinds to trace.
pub struct TracingBackend {
    name: String,
}

impl TracingBackend {
    /// Create a new TracingBackend with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn emit(&self, entry: &LogEntry) {
        let backend = self.name.as_str();
        let namespace = entry.namespace();
        let timestamp = entry.timestamp.as_deref().unwrap_or_default();
        macro_rules! event {
            ($level:ident) => {
                $level!(
                    backend,
                    origin = %namespace,
                    entry_level = entry.level,
                    timestamp,
                    trace = entry.trace.as_deref(),
                    "{}",
                    entry.message
                )
            };
        }

        match entry.kind {
            EntryKind::Error => event!(error),
            EntryKind::Warn => event!(warn),
            EntryKind::Info => event!(info),
            EntryKind::Log => event!(debug),
            EntryKind::Other(_) => event!(trace),
        }
    }
}

impl Backend for TracingBackend {
    fn push(&self, entry: &LogEntry, done: Completion) -> Result<(), ContractError> {
        self.emit(entry);
        done.complete()
    }

    fn group(&self, name: &str, done: Completion) -> Result<(), ContractError> {
        debug!(backend = %self.name, group = name, "Group opened");
        done.complete()
    }

    fn group_end(&self, done: Completion) -> Result<(), ContractError> {
        debug!(backend = %self.name, "Group closed");
        done.complete()
    }
}
