//! Error types for CLI operations.

use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Input file could not be opened
    #[error("Failed to open input {path}: {message}")]
    InputOpen { path: String, message: String },

    /// A line of the operations stream is not a valid operation
    #[error("Malformed operation on line {line}: {message}")]
    MalformedOp { line: u64, message: String },

    /// The router rejected an operation
    #[error("Routing failed on line {line}: {source}")]
    Routing {
        line: u64,
        #[source]
        source: contracts::ContractError,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub fn input_open(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InputOpen {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn malformed_op(line: u64, message: impl Into<String>) -> Self {
        Self::MalformedOp {
            line,
            message: message.into(),
        }
    }

    pub fn routing(line: u64, source: contracts::ContractError) -> Self {
        Self::Routing { line, source }
    }
}

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
