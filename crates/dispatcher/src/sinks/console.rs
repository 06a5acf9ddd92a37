//! ConsoleBackend - prints entries to stdout/stderr

use std::io::{self, Write};

use contracts::{Backend, Completion, ContractError, EntryKind, LogEntry};
use parking_lot::Mutex;

use super::render_body;

const INDENT: &str = "  ";

struct ConsoleState {
    out: Box<dyn Write + Send>,
    err: Box<dyn Write + Send>,
    depth: usize,
}

/// Backend printing `[app:logger@level] timestamp: message`
///
/// `warn` and `error` entries go to the error stream, everything else to
/// the output stream. Group contents are indented two spaces per level.
pub struct ConsoleBackend {
    state: Mutex<ConsoleState>,
}

impl ConsoleBackend {
    /// Console backend bound to the process stdout and stderr
    pub fn new() -> Self {
        Self::with_writers(io::stdout(), io::stderr())
    }

    pub fn with_writers(
        out: impl Write + Send + 'static,
        err: impl Write + Send + 'static,
    ) -> Self {
        Self {
            state: Mutex::new(ConsoleState {
                out: Box::new(out),
                err: Box::new(err),
                depth: 0,
            }),
        }
    }

    pub fn depth(&self) -> usize {
        self.state.lock().depth
    }

    fn format(entry: &LogEntry, depth: usize) -> String {
        let indent = INDENT.repeat(depth);
        let text = format!("[{}@{}]{}", entry.namespace(), entry.level, render_body(entry, false));
        let mut line = text
            .lines()
            .map(|l| format!("{indent}{l}"))
            .collect::<Vec<_>>()
            .join("\n");
        line.push('\n');
        line
    }
}

impl Default for ConsoleBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn write_failure(err: io::Error) -> ContractError {
    ContractError::backend_failure("console", err.to_string())
}

impl Backend for ConsoleBackend {
    fn push(&self, entry: &LogEntry, done: Completion) -> Result<(), ContractError> {
        let written = {
            let mut state = self.state.lock();
            let line = Self::format(entry, state.depth);
            let stream = match entry.kind {
                EntryKind::Warn | EntryKind::Error => &mut state.err,
                _ => &mut state.out,
            };
            stream.write_all(line.as_bytes()).and_then(|()| stream.flush())
        };
        match written {
            Ok(()) => done.complete(),
            Err(e) => {
                done.abandon();
                Err(write_failure(e))
            }
        }
    }

    fn group(&self, name: &str, done: Completion) -> Result<(), ContractError> {
        let written = {
            let mut state = self.state.lock();
            let header = format!("{}{name}\n", INDENT.repeat(state.depth));
            state.depth += 1;
            state.out.write_all(header.as_bytes()).and_then(|()| state.out.flush())
        };
        match written {
            Ok(()) => done.complete(),
            Err(e) => {
                done.abandon();
                Err(write_failure(e))
            }
        }
    }

    fn group_end(&self, done: Completion) -> Result<(), ContractError> {
        {
            let mut state = self.state.lock();
            state.depth = state.depth.saturating_sub(1);
        }
        done.complete()
    }
}
