//! RouterBlueprint - Config Loader output
//!
//! Describes a complete router: application name, scheduling strategy and the
//! ordered list of backends.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Config version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete router blueprint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterBlueprint {
    /// Config version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Application name stamped on every entry
    pub app_name: String,

    /// Continuation runner
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// Backends in registration (delivery) order
    #[serde(default)]
    pub backends: Vec<BackendConfig>,
}

/// Continuation runner selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SchedulerConfig {
    /// Run continuations on the submitting thread
    #[default]
    Inline,
    /// Spawn continuations on the tokio runtime, optionally after a delay
    Tokio {
        #[serde(default)]
        delay_ms: u64,
    },
}

/// Backend output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Backend name
    pub name: String,

    /// Backend type
    pub backend_type: BackendType,

    /// Queue capacity for worker-backed backends
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Type-specific parameters
    #[serde(default)]
    pub params: HashMap<String, String>,
}

fn default_queue_capacity() -> usize {
    100
}

/// Backend type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendType {
    /// Print to stdout/stderr
    Console,
    /// Append to a file through an async worker
    File,
    /// Re-emit as tracing events
    Tracing,
}

impl BackendType {
    /// Parameters this backend type cannot run without
    pub fn required_params(&self) -> &'static [&'static str] {
        match self {
            Self::Console | Self::Tracing => &[],
            Self::File => &["path"],
        }
    }
}
