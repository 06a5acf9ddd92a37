//! # Contracts
//!
//! Frozen interface contracts shared by every crate in the workspace.
//! Business crates depend on this crate only; reverse dependencies are prohibited.
//!
//! ## Delivery Model
//! - Producers submit [`LogEntry`] values and open/close group brackets
//! - The router flattens both into a single stream of [`Unit`]s
//! - Every [`Backend`] receives every unit, signalling a [`Completion`] when done

mod backend;
mod blueprint;
mod entry;
mod environment;
mod error;
mod scheduler;
mod sink;
mod stats;

pub use backend::{Backend, Completion};
pub use blueprint::*;
pub use entry::{EntryKind, LogEntry, Namespace, Unit};
pub use environment::{Environment, TimerFn, TimestampFn, TracerFn};
pub use error::*;
pub use scheduler::{Continuation, Scheduler};
pub use sink::*;
pub use stats::DispatchStats;
