//! AsyncSink trait - asynchronous sink interface
//!
//! Sinks doing real I/O implement this trait and are bridged onto the
//! callback-based [`Backend`](crate::Backend) contract by a worker handle.

use crate::{ContractError, Unit};

/// Asynchronous output trait
#[trait_variant::make(AsyncSink: Send)]
pub trait LocalAsyncSink {
    /// Sink name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Write one delivery unit
    ///
    /// # Errors
    /// Returns write error (should include context)
    async fn write(&mut self, unit: &Unit) -> Result<(), ContractError>;

    /// Flush buffer (if any)
    async fn flush(&mut self) -> Result<(), ContractError>;

    /// Close sink
    async fn close(&mut self) -> Result<(), ContractError>;
}
