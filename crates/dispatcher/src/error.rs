//! Dispatcher error types

use thiserror::Error;

/// Construction errors for the router
#[derive(Debug, Error)]
pub enum DispatcherError {
    /// Sink creation error
    #[error("failed to create backend '{name}': {message}")]
    SinkCreation { name: String, message: String },

    /// Two backends registered under one name
    #[error("backend '{name}' is already registered")]
    DuplicateBackend { name: String },

    /// Contract error
    #[error("contract error: {0}")]
    Contract(#[from] contracts::ContractError),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl DispatcherError {
    /// Create a sink creation error
    pub fn sink_creation(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkCreation {
            name: name.into(),
            message: message.into(),
        }
    }
}
