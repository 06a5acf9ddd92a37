//! # Dispatcher
//!
//! Log routing core.
//!
//! Responsibilities:
//! - Accept entries and group brackets from named producers
//! - Keep each producer's groups contiguous in the delivery stream
//! - Deliver every unit to every backend in order, one completion at a time
//! - Run each delivery step through a pluggable scheduler

mod dispatcher;
pub mod environment;
pub mod error;
pub mod factory;
pub mod group;
pub mod handle;
pub mod logger;
pub mod manager;
pub mod metrics;
pub mod queue;
pub mod scheduler;
pub mod sinks;

#[cfg(test)]
mod test_support;

pub use contracts::{AsyncSink, Backend, Completion, LogEntry, Unit};
pub use dispatcher::{DrainCycle, Phase, Step};
pub use error::DispatcherError;
pub use factory::{create_manager, Router};
pub use handle::SinkHandle;
pub use logger::Logger;
pub use manager::{BackendRegistration, Manager, ManagerBuilder, ManagerPhase, ManagerStatus};
pub use metrics::{DispatchMetrics, MetricsSnapshot, SinkMetrics};
pub use scheduler::{scheduler_from_config, InlineScheduler, QueuedScheduler, TokioScheduler};
pub use sinks::{ConsoleBackend, FileSink, TracingBackend};
