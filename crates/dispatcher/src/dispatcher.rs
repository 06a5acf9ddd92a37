//! Dispatcher - resumable drain cycle
//!
//! A drain cycle walks the delivery queue one unit at a time. Each unit is
//! handed to every backend in registration order, and a backend only receives
//! it after the previous backend signalled completion. Every backend call and
//! every unit boundary is a separate continuation handed to the scheduler.

use std::sync::Arc;
use std::time::Instant;

use contracts::{Completion, ContractError, Unit};
use tracing::{debug, error, trace, warn};

use crate::manager::Shared;
use crate::queue::Cursor;

/// Next action of a drain cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Resolve the next unit, or finish the cycle when the queue is exhausted
    Resolve,
    /// Hand the current unit to the backend at this registration index
    Deliver(usize),
}

/// Idle/Draining state machine owned by the manager
#[derive(Debug, Default)]
pub enum Phase {
    #[default]
    Idle,
    Draining(DrainCycle),
}

impl Phase {
    pub fn is_draining(&self) -> bool {
        matches!(self, Self::Draining(_))
    }

    /// The running cycle, if it is the one tagged `epoch`
    fn cycle_mut(&mut self, epoch: u64) -> Option<&mut DrainCycle> {
        match self {
            Self::Draining(cycle) if cycle.epoch == epoch => Some(cycle),
            _ => None,
        }
    }
}

/// Position of the running drain cycle
#[derive(Debug)]
pub struct DrainCycle {
    epoch: u64,
    cursor: Cursor,
    current: Option<Unit>,
    awaiting: Option<usize>,
    delivered: u64,
    started: Instant,
}

impl DrainCycle {
    pub(crate) fn new(epoch: u64) -> Self {
        Self {
            epoch,
            cursor: Cursor::default(),
            current: None,
            awaiting: None,
            delivered: 0,
            started: Instant::now(),
        }
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    /// Unit being fanned out, if any
    pub fn current(&self) -> Option<&Unit> {
        self.current.as_ref()
    }

    /// Backend whose completion is outstanding
    pub fn awaiting(&self) -> Option<usize> {
        self.awaiting
    }
}

/// Drives one drain cycle; cheap to clone into continuations
///
/// Continuations of a finished or aborted cycle carry a stale epoch and do
/// nothing when they run.
#[derive(Clone)]
pub(crate) struct Dispatcher {
    shared: Arc<Shared>,
    epoch: u64,
}

impl Dispatcher {
    /// Schedule the first step of the cycle tagged `epoch`
    pub(crate) fn start(shared: &Arc<Shared>, epoch: u64) -> Result<(), ContractError> {
        debug!(app = %shared.app_name, epoch, "Drain cycle started");
        Self {
            shared: Arc::clone(shared),
            epoch,
        }
        .schedule(Step::Resolve)
    }

    fn schedule(&self, step: Step) -> Result<(), ContractError> {
        let this = self.clone();
        self.shared
            .scheduler
            .schedule(Box::new(move || this.run(step)))
    }

    fn run(self, step: Step) -> Result<(), ContractError> {
        match step {
            Step::Resolve => self.resolve(),
            Step::Deliver(index) => self.deliver(index),
        }
    }

    fn resolve(&self) -> Result<(), ContractError> {
        {
            let mut guard = self.shared.state.lock();
            let state = &mut *guard;
            let Some(cycle) = state.phase.cycle_mut(self.epoch) else {
                return Ok(());
            };

            let next = state.queue.next_unit(&mut cycle.cursor);
            state.queue.release_consumed(&mut cycle.cursor);
            match next {
                Some(unit) => {
                    trace!(unit = unit.label(), cursor = ?cycle.cursor, "Unit resolved");
                    cycle.current = Some(unit);
                }
                None => {
                    let delivered = cycle.delivered;
                    let elapsed = cycle.started.elapsed();
                    state.end_drain();
                    self.shared.metrics.inc_cycles_completed();
                    debug!(
                        app = %self.shared.app_name,
                        units = delivered,
                        elapsed_ms = elapsed.as_secs_f64() * 1000.0,
                        "Drain cycle finished"
                    );
                    return Ok(());
                }
            }
        }

        if self.shared.backends.is_empty() {
            self.finish_unit();
            return self.schedule(Step::Resolve);
        }
        self.schedule(Step::Deliver(0))
    }

    fn deliver(&self, index: usize) -> Result<(), ContractError> {
        let unit = {
            let mut state = self.shared.state.lock();
            let Some(cycle) = state.phase.cycle_mut(self.epoch) else {
                return Ok(());
            };
            let Some(unit) = cycle.current.clone() else {
                return Ok(());
            };
            cycle.awaiting = Some(index);
            unit
        };

        let Some(registration) = self.shared.backends.get(index) else {
            return self.schedule(Step::Resolve);
        };
        trace!(backend = %registration.name(), unit = unit.label(), "Delivering unit");

        let done = self.completion(index, registration.name());
        let backend = registration.handle();
        let result = match &unit {
            Unit::Entry(entry) => backend.push(entry, done),
            Unit::GroupOpen { name } => backend.group(name, done),
            Unit::GroupEnd => backend.group_end(done),
        };

        result.map_err(|e| self.abort(registration.name(), e))
    }

    fn completion(&self, index: usize, name: &str) -> Completion {
        let this = self.clone();
        Completion::new(name, move || this.backend_done(index))
    }

    fn backend_done(&self, index: usize) -> Result<(), ContractError> {
        let next = {
            let mut state = self.shared.state.lock();
            let Some(cycle) = state.phase.cycle_mut(self.epoch) else {
                return Ok(());
            };
            if cycle.awaiting != Some(index) {
                warn!(backend = index, "Completion signalled out of turn, ignored");
                return Ok(());
            }
            cycle.awaiting = None;

            if index + 1 < self.shared.backends.len() {
                Step::Deliver(index + 1)
            } else {
                cycle.current = None;
                cycle.delivered += 1;
                self.shared.metrics.inc_units_delivered();
                Step::Resolve
            }
        };
        self.schedule(next)
    }

    /// Account for a unit when there is nobody to deliver it to
    fn finish_unit(&self) {
        let mut state = self.shared.state.lock();
        if let Some(cycle) = state.phase.cycle_mut(self.epoch) {
            cycle.current = None;
            cycle.delivered += 1;
        }
    }

    /// Abandon the cycle after a backend failure
    ///
    /// Units already resolved count as consumed; the rest stay queued for the
    /// next cycle.
    fn abort(&self, backend: &str, err: ContractError) -> ContractError {
        {
            let mut guard = self.shared.state.lock();
            let state = &mut *guard;
            if let Some(cycle) = state.phase.cycle_mut(self.epoch) {
                let cursor = cycle.cursor;
                state.queue.discard_consumed(&cursor);
                state.end_drain();
            }
        }
        self.shared.metrics.inc_backend_failures();
        error!(backend, error = %err, "Backend failed, drain cycle aborted");

        match err {
            failure @ ContractError::BackendFailure { .. } => failure,
            other => ContractError::backend_failure(backend, other.to_string()),
        }
    }
}
