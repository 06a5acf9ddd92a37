//! DispatchStats - router counters consumed by observability

use serde::{Deserialize, Serialize};

/// Point-in-time router counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchStats {
    /// Entries accepted by `submit`
    pub entries_submitted: u64,
    /// Units delivered to every backend
    pub units_delivered: u64,
    /// Group runs released to the queue
    pub groups_closed: u64,
    /// Drain cycles that ran to exhaustion
    pub cycles_completed: u64,
    /// Drain cycles aborted by a backend failure
    pub backend_failures: u64,
    /// Top-level items waiting in the delivery queue
    pub queued_items: usize,
    /// Producers with at least one open group
    pub open_groups: usize,
}
