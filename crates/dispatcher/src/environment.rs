//! Default environment providers

use std::backtrace::{Backtrace, BacktraceStatus};
use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use contracts::{Environment, TimerFn, TimestampFn, TracerFn};

/// ISO-8601 UTC wall-clock time with millisecond precision
pub fn default_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Milliseconds since the Unix epoch
pub fn default_timer() -> u64 {
    u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0)
}

/// Call stack of the caller, one function per line
#[inline(never)]
pub fn default_tracer() -> String {
    trim_backtrace(&Backtrace::force_capture().to_string())
}

/// Whether this host can capture call stacks at all
pub fn tracing_supported() -> bool {
    Backtrace::force_capture().status() == BacktraceStatus::Captured
}

/// Frames belonging to the capture machinery itself
const SKIPPED_FRAMES: &[&str] = &[
    "Environment::trace",
    "core::ops::function::",
    "Logger::emit",
];

/// Reduce a rendered backtrace to the frames above `default_tracer`
///
/// Frame numbers and `at file:line` locations are stripped.
fn trim_backtrace(raw: &str) -> String {
    let frames: Vec<&str> = raw
        .lines()
        .filter_map(|line| {
            let (index, name) = line.trim_start().split_once(": ")?;
            index.parse::<usize>().ok().map(|_| name.trim())
        })
        .collect();

    let start = frames
        .iter()
        .rposition(|name| name.contains("default_tracer"))
        .map_or(0, |pos| pos + 1);

    frames[start..]
        .iter()
        .filter(|name| !SKIPPED_FRAMES.iter().any(|skip| name.contains(skip)))
        .copied()
        .collect::<Vec<_>>()
        .join("\n")
}

/// Environment with every provider at its default
pub fn default_environment() -> Environment {
    EnvironmentOverrides::default().resolve()
}

/// Optional provider overrides, resolved against the defaults
#[derive(Default, Clone)]
pub struct EnvironmentOverrides {
    pub timestamp: Option<TimestampFn>,
    pub timer: Option<TimerFn>,
    pub tracer: Option<TracerFn>,
}

impl EnvironmentOverrides {
    pub fn resolve(self) -> Environment {
        let tracer = self.tracer.or_else(|| {
            tracing_supported().then(|| Arc::new(default_tracer) as TracerFn)
        });
        Environment {
            timestamp: self.timestamp.unwrap_or_else(|| Arc::new(default_timestamp)),
            timer: self.timer.unwrap_or_else(|| Arc::new(default_timer)),
            tracer,
        }
    }
}
