//! Environment providers used by producers when building entries

use std::fmt;
use std::sync::Arc;

/// Produces a wall-clock timestamp string
pub type TimestampFn = Arc<dyn Fn() -> String + Send + Sync>;

/// Produces a millisecond reading
pub type TimerFn = Arc<dyn Fn() -> u64 + Send + Sync>;

/// Produces a call-stack description
pub type TracerFn = Arc<dyn Fn() -> String + Send + Sync>;

/// Providers exposed by the router to its producers
#[derive(Clone)]
pub struct Environment {
    pub timestamp: TimestampFn,
    pub timer: TimerFn,
    /// Absent when the host cannot capture call stacks
    pub tracer: Option<TracerFn>,
}

impl Environment {
    pub fn timestamp(&self) -> String {
        (self.timestamp)()
    }

    pub fn now_ms(&self) -> u64 {
        (self.timer)()
    }

    pub fn trace(&self) -> Option<String> {
        self.tracer.as_ref().map(|tracer| tracer())
    }
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Environment")
            .field("tracer", &self.tracer.is_some())
            .finish_non_exhaustive()
    }
}
