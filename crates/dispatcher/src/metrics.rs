//! Router and sink metrics for observability

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use contracts::DispatchStats;

/// Metrics for a single worker-backed sink
#[derive(Debug, Default)]
pub struct SinkMetrics {
    /// Current queue length
    queue_len: AtomicUsize,
    /// Total successful writes
    write_count: AtomicU64,
    /// Total write failures
    failure_count: AtomicU64,
}

impl SinkMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue_len(&self) -> usize {
        self.queue_len.load(Ordering::Relaxed)
    }

    pub fn set_queue_len(&self, len: usize) {
        self.queue_len.store(len, Ordering::Relaxed);
    }

    pub fn write_count(&self) -> u64 {
        self.write_count.load(Ordering::Relaxed)
    }

    pub fn inc_write_count(&self) {
        self.write_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn failure_count(&self) -> u64 {
        self.failure_count.load(Ordering::Relaxed)
    }

    pub fn inc_failure_count(&self) {
        self.failure_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            queue_len: self.queue_len(),
            write_count: self.write_count(),
            failure_count: self.failure_count(),
        }
    }
}

/// Snapshot of sink metrics (for reporting)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub queue_len: usize,
    pub write_count: u64,
    pub failure_count: u64,
}

/// Counters maintained by a manager
#[derive(Debug, Default)]
pub struct DispatchMetrics {
    entries_submitted: AtomicU64,
    units_delivered: AtomicU64,
    groups_closed: AtomicU64,
    cycles_completed: AtomicU64,
    backend_failures: AtomicU64,
}

impl DispatchMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc_entries_submitted(&self) {
        self.entries_submitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_units_delivered(&self) {
        self.units_delivered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_groups_closed(&self) {
        self.groups_closed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_cycles_completed(&self) {
        self.cycles_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_backend_failures(&self) {
        self.backend_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Counter snapshot; queue and group gauges are filled in by the manager
    pub fn snapshot(&self, queued_items: usize, open_groups: usize) -> DispatchStats {
        DispatchStats {
            entries_submitted: self.entries_submitted.load(Ordering::Relaxed),
            units_delivered: self.units_delivered.load(Ordering::Relaxed),
            groups_closed: self.groups_closed.load(Ordering::Relaxed),
            cycles_completed: self.cycles_completed.load(Ordering::Relaxed),
            backend_failures: self.backend_failures.load(Ordering::Relaxed),
            queued_items,
            open_groups,
        }
    }
}
