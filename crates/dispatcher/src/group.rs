//! GroupTracker - per-producer bracket buffering
//!
//! While a producer has an open group, everything it submits is buffered in a
//! [`GroupRun`]. The run is released as one block when its outermost bracket
//! closes, so other producers never see a partial group.

use std::collections::HashMap;
use std::sync::Arc;

use contracts::{ContractError, LogEntry, Unit};
use tracing::{debug, warn};

/// Outcome of routing an entry through the tracker
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Routing {
    /// Appended to the producer's open run
    Buffered,
    /// No open run; the caller enqueues the entry directly
    PassThrough(Arc<LogEntry>),
}

/// Buffered content of one producer's nested bracket sequence
#[derive(Debug, Clone)]
pub struct GroupRun {
    owner: String,
    depth: usize,
    buffer: Vec<Unit>,
}

impl GroupRun {
    fn new(owner: &str) -> Self {
        Self {
            owner: owner.to_string(),
            depth: 0,
            buffer: Vec::new(),
        }
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn buffered(&self) -> &[Unit] {
        &self.buffer
    }
}

/// Open group runs keyed by producer name
#[derive(Debug, Default)]
pub struct GroupTracker {
    runs: HashMap<String, GroupRun>,
}

impl GroupTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffer `entry` if its producer has an open run
    pub fn route(&mut self, entry: Arc<LogEntry>) -> Routing {
        match self.runs.get_mut(&entry.origin_logger) {
            Some(run) => {
                run.buffer.push(Unit::Entry(entry));
                Routing::Buffered
            }
            None => Routing::PassThrough(entry),
        }
    }

    /// Open a (possibly nested) group for `producer`
    pub fn open(&mut self, producer: &str, name: impl Into<String>) {
        let run = self
            .runs
            .entry(producer.to_string())
            .or_insert_with(|| GroupRun::new(producer));
        run.buffer.push(Unit::group_open(name));
        run.depth += 1;
        debug!(producer, depth = run.depth, "Group opened");
    }

    /// Close the innermost group of `producer`
    ///
    /// Returns the completed buffer once the outermost group closes.
    ///
    /// # Errors
    /// `GroupUnderflow` when `producer` has no open group.
    pub fn close(&mut self, producer: &str) -> Result<Option<Vec<Unit>>, ContractError> {
        let Some(run) = self.runs.get_mut(producer) else {
            warn!(producer, "Group closed without a matching open group");
            return Err(ContractError::group_underflow(producer));
        };

        run.buffer.push(Unit::GroupEnd);
        run.depth -= 1;
        debug!(producer, depth = run.depth, "Group closed");

        if run.depth > 0 {
            return Ok(None);
        }
        Ok(self.runs.remove(producer).map(|run| run.buffer))
    }

    /// Current bracket depth of `producer` (0 when none is open)
    pub fn depth(&self, producer: &str) -> usize {
        self.runs.get(producer).map_or(0, GroupRun::depth)
    }

    pub fn run(&self, producer: &str) -> Option<&GroupRun> {
        self.runs.get(producer)
    }

    /// Number of producers with an open run
    pub fn open_runs(&self) -> usize {
        self.runs.len()
    }
}
