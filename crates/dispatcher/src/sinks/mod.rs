//! Backend implementations
//!
//! Contains ConsoleBackend, TracingBackend, and the async FileSink.

mod console;
mod file;
mod log;

pub use self::console::ConsoleBackend;
pub use self::file::{FileSink, FileSinkConfig, DEFAULT_LOG_FILE};
pub use self::log::TracingBackend;

use contracts::LogEntry;

/// `timestamp: message` followed by the trace on its own line, if any
///
/// With `skip_empty_message`, an empty message drops the `: ` separator too.
fn render_body(entry: &LogEntry, skip_empty_message: bool) -> String {
    let mut body = String::new();
    if let Some(timestamp) = &entry.timestamp {
        body.push(' ');
        body.push_str(timestamp);
    }
    if !(skip_empty_message && entry.message.is_empty()) {
        body.push_str(": ");
        body.push_str(&entry.message);
    }
    if let Some(trace) = &entry.trace {
        body.push('\n');
        body.push_str(trace);
    }
    body
}
