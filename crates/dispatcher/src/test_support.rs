//! Backends used by unit tests

use std::sync::Arc;

use contracts::{Backend, Completion, ContractError, LogEntry};
use parking_lot::Mutex;

/// Records every operation and completes immediately
#[derive(Clone, Default)]
pub struct Recorder {
    events: Arc<Mutex<Vec<String>>>,
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl Recorder {
    /// Operations as `push(app:logger:message)`, `group(name)`, `group_end`
    pub fn events(&self) -> Vec<String> {
        self.events.lock().clone()
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.lock().clone()
    }
}

impl Backend for Recorder {
    fn push(&self, entry: &LogEntry, done: Completion) -> Result<(), ContractError> {
        self.events
            .lock()
            .push(format!("push({}:{})", entry.namespace(), entry.message));
        self.entries.lock().push(entry.clone());
        done.complete()
    }

    fn group(&self, name: &str, done: Completion) -> Result<(), ContractError> {
        self.events.lock().push(format!("group({name})"));
        done.complete()
    }

    fn group_end(&self, done: Completion) -> Result<(), ContractError> {
        self.events.lock().push("group_end".to_string());
        done.complete()
    }
}

/// Records operations but holds completions until released
#[derive(Clone, Default)]
pub struct Deferred {
    pub recorder: Recorder,
    pending: Arc<Mutex<Vec<Completion>>>,
}

impl Deferred {
    pub fn pending(&self) -> usize {
        self.pending.lock().len()
    }

    /// Signal the oldest held completion
    pub fn release(&self) -> Result<(), ContractError> {
        let done = {
            let mut pending = self.pending.lock();
            if pending.is_empty() {
                return Ok(());
            }
            pending.remove(0)
        };
        done.complete()
    }

    fn hold(&self, done: Completion) -> Result<(), ContractError> {
        self.pending.lock().push(done);
        Ok(())
    }
}

impl Backend for Deferred {
    fn push(&self, entry: &LogEntry, done: Completion) -> Result<(), ContractError> {
        self.recorder.push(entry, Completion::noop())?;
        self.hold(done)
    }

    fn group(&self, name: &str, done: Completion) -> Result<(), ContractError> {
        self.recorder.group(name, Completion::noop())?;
        self.hold(done)
    }

    fn group_end(&self, done: Completion) -> Result<(), ContractError> {
        self.recorder.group_end(Completion::noop())?;
        self.hold(done)
    }
}

/// Fails every push whose message matches `poison`
#[derive(Clone)]
pub struct Failing {
    pub recorder: Recorder,
    poison: String,
}

impl Failing {
    pub fn new(poison: &str) -> Self {
        Self {
            recorder: Recorder::default(),
            poison: poison.to_string(),
        }
    }
}

impl Backend for Failing {
    fn push(&self, entry: &LogEntry, done: Completion) -> Result<(), ContractError> {
        if entry.message == self.poison {
            done.abandon();
            return Err(ContractError::backend_failure("failing", "poisoned entry"));
        }
        self.recorder.push(entry, done)
    }

    fn group(&self, name: &str, done: Completion) -> Result<(), ContractError> {
        self.recorder.group(name, done)
    }

    fn group_end(&self, done: Completion) -> Result<(), ContractError> {
        self.recorder.group_end(done)
    }
}
