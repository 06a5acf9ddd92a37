//! Scheduler trait - continuation runner driving the router

use crate::ContractError;

/// A zero-argument unit of work handed to a [`Scheduler`]
pub type Continuation = Box<dyn FnOnce() -> Result<(), ContractError> + Send + 'static>;

/// Continuation runner
///
/// Implementations decide the execution substrate: run immediately, park the
/// continuation on a queue, spawn it on a runtime, or defer it behind a timer.
/// Every scheduled continuation must eventually be invoked exactly once.
pub trait Scheduler: Send + Sync {
    /// Schedule `task` for execution
    ///
    /// # Errors
    /// Schedulers that run continuations on the calling thread return the
    /// first error raised by them; deferring schedulers only fail when the
    /// continuation cannot be accepted.
    fn schedule(&self, task: Continuation) -> Result<(), ContractError>;
}
