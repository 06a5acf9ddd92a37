//! Relay orchestration module.

mod ops;
mod orchestrator;
mod stats;

pub use ops::Op;
pub use orchestrator::{Relay, RelayConfig};
pub use stats::RelayStats;
