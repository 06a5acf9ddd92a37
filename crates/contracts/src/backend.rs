//! Backend trait - router output interface
//!
//! Every sink the router fans out to implements [`Backend`]. Each operation
//! receives a [`Completion`] that must be signalled exactly once, either before
//! returning or later from any thread.

use std::fmt;
use std::sync::Arc;

use tracing::warn;

use crate::{ContractError, LogEntry};

type Signal = Box<dyn FnOnce() -> Result<(), ContractError> + Send>;

/// One-shot completion signal handed to a backend operation
///
/// Consuming `complete` makes double signalling impossible. Dropping a
/// completion without signalling it halts delivery for the owning router, so
/// the drop is reported as a warning.
pub struct Completion {
    label: String,
    signal: Option<Signal>,
}

impl Completion {
    /// Wrap a signal closure; `label` identifies the receiver in diagnostics
    pub fn new<F>(label: impl Into<String>, signal: F) -> Self
    where
        F: FnOnce() -> Result<(), ContractError> + Send + 'static,
    {
        Self {
            label: label.into(),
            signal: Some(Box::new(signal)),
        }
    }

    /// A completion whose signal does nothing
    pub fn noop() -> Self {
        Self {
            label: String::new(),
            signal: None,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Discard the completion without signalling
    ///
    /// For backends that return an error instead of completing.
    pub fn abandon(mut self) {
        self.signal = None;
    }

    /// Signal that the operation finished
    ///
    /// # Errors
    /// Returns whatever the continuation scheduled by this signal surfaces,
    /// e.g. a failure of a later backend when the scheduler runs inline.
    pub fn complete(mut self) -> Result<(), ContractError> {
        match self.signal.take() {
            Some(signal) => signal(),
            None => Ok(()),
        }
    }
}

impl Drop for Completion {
    fn drop(&mut self) {
        if self.signal.is_some() {
            warn!(
                backend = %self.label,
                "Completion dropped without being signalled, delivery is stalled"
            );
        }
    }
}

impl fmt::Debug for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Completion")
            .field("label", &self.label)
            .field("pending", &self.signal.is_some())
            .finish()
    }
}

/// Sink capability contract
///
/// An `Err` return means the operation failed and `done` was not signalled;
/// the router aborts its current drain cycle and surfaces the error.
pub trait Backend: Send + Sync {
    /// Deliver a log entry
    fn push(&self, entry: &LogEntry, done: Completion) -> Result<(), ContractError>;

    /// Open a named group; subsequent units belong to it until `group_end`
    fn group(&self, name: &str, done: Completion) -> Result<(), ContractError>;

    /// Close the innermost open group
    fn group_end(&self, done: Completion) -> Result<(), ContractError>;
}

impl<T: Backend + ?Sized> Backend for Arc<T> {
    fn push(&self, entry: &LogEntry, done: Completion) -> Result<(), ContractError> {
        (**self).push(entry, done)
    }

    fn group(&self, name: &str, done: Completion) -> Result<(), ContractError> {
        (**self).group(name, done)
    }

    fn group_end(&self, done: Completion) -> Result<(), ContractError> {
        (**self).group_end(done)
    }
}

impl<T: Backend + ?Sized> Backend for Box<T> {
    fn push(&self, entry: &LogEntry, done: Completion) -> Result<(), ContractError> {
        (**self).push(entry, done)
    }

    fn group(&self, name: &str, done: Completion) -> Result<(), ContractError> {
        (**self).group(name, done)
    }

    fn group_end(&self, done: Completion) -> Result<(), ContractError> {
        (**self).group_end(done)
    }
}
