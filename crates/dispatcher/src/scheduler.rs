//! Continuation runners
//!
//! - [`InlineScheduler`]: immediate, on the calling thread
//! - [`QueuedScheduler`]: parked until the host drains it
//! - [`TokioScheduler`]: spawned on a tokio runtime, optionally delayed

use std::cell::RefCell;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use contracts::{ContractError, Continuation, Scheduler, SchedulerConfig};
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tracing::{error, warn};

thread_local! {
    static TRAMPOLINE: RefCell<Option<VecDeque<Continuation>>> = const { RefCell::new(None) };
}

/// Clears the thread's trampoline when the outermost runner exits
struct TrampolineGuard;

impl Drop for TrampolineGuard {
    fn drop(&mut self) {
        TRAMPOLINE.with(|cell| *cell.borrow_mut() = None);
    }
}

/// Runs continuations immediately on the calling thread
///
/// Continuations scheduled while another one is running are queued on a
/// per-thread trampoline and run by the outermost `schedule` call, so a drain
/// cycle never deepens the stack. When every backend completes synchronously,
/// `schedule` returns only after the whole cycle has been delivered.
#[derive(Debug, Default, Clone, Copy)]
pub struct InlineScheduler;

impl Scheduler for InlineScheduler {
    fn schedule(&self, task: Continuation) -> Result<(), ContractError> {
        let first = TRAMPOLINE.with(|cell| {
            let mut slot = cell.borrow_mut();
            match slot.as_mut() {
                Some(queue) => {
                    queue.push_back(task);
                    None
                }
                None => {
                    *slot = Some(VecDeque::new());
                    Some(task)
                }
            }
        });

        // Nested call: the outer runner will pick the task up.
        let Some(first) = first else {
            return Ok(());
        };

        let _guard = TrampolineGuard;
        let mut outcome = Ok(());
        let mut next = Some(first);
        while let Some(task) = next {
            if let Err(e) = task() {
                if outcome.is_ok() {
                    outcome = Err(e);
                } else {
                    warn!(error = %e, "Additional continuation failure");
                }
            }
            next = TRAMPOLINE.with(|cell| cell.borrow_mut().as_mut().and_then(VecDeque::pop_front));
        }
        outcome
    }
}

/// Parks continuations in a FIFO until the host runs them
///
/// Clones share the same queue.
#[derive(Clone, Default)]
pub struct QueuedScheduler {
    queue: Arc<Mutex<VecDeque<Continuation>>>,
}

impl QueuedScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Continuations waiting to run
    pub fn pending(&self) -> usize {
        self.queue.lock().len()
    }

    /// Run the oldest continuation, if any
    pub fn run_next(&self) -> Option<Result<(), ContractError>> {
        let task = self.queue.lock().pop_front()?;
        Some(task())
    }

    /// Run continuations until the queue is empty
    ///
    /// Returns the number of continuations run.
    ///
    /// # Errors
    /// Stops at the first failing continuation; later ones stay queued.
    pub fn run_until_idle(&self) -> Result<usize, ContractError> {
        let mut ran = 0;
        while let Some(result) = self.run_next() {
            ran += 1;
            result?;
        }
        Ok(ran)
    }
}

impl Scheduler for QueuedScheduler {
    fn schedule(&self, task: Continuation) -> Result<(), ContractError> {
        self.queue.lock().push_back(task);
        Ok(())
    }
}

impl std::fmt::Debug for QueuedScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueuedScheduler")
            .field("pending", &self.pending())
            .finish()
    }
}

/// Spawns each continuation as a tokio task
#[derive(Debug, Clone)]
pub struct TokioScheduler {
    handle: Handle,
    delay: Option<Duration>,
}

impl TokioScheduler {
    pub fn new(handle: Handle) -> Self {
        Self {
            handle,
            delay: None,
        }
    }

    /// Bind to the runtime of the calling context
    ///
    /// # Errors
    /// Fails outside a tokio runtime.
    pub fn current() -> Result<Self, ContractError> {
        Handle::try_current()
            .map(Self::new)
            .map_err(|e| ContractError::scheduler(format!("no tokio runtime: {e}")))
    }

    /// Defer every continuation by `delay`
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = (!delay.is_zero()).then_some(delay);
        self
    }
}

impl Scheduler for TokioScheduler {
    fn schedule(&self, task: Continuation) -> Result<(), ContractError> {
        let delay = self.delay;
        self.handle.spawn(async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            if let Err(e) = task() {
                error!(error = %e, "Scheduled continuation failed");
            }
        });
        Ok(())
    }
}

/// Build the scheduler selected by configuration
///
/// # Errors
/// The tokio variant fails outside a tokio runtime.
pub fn scheduler_from_config(config: &SchedulerConfig) -> Result<Arc<dyn Scheduler>, ContractError> {
    match *config {
        SchedulerConfig::Inline => Ok(Arc::new(InlineScheduler)),
        SchedulerConfig::Tokio { delay_ms } => Ok(Arc::new(
            TokioScheduler::current()?.with_delay(Duration::from_millis(delay_ms)),
        )),
    }
}
