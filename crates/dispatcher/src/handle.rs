//! SinkHandle - runs an async sink behind the completion-based backend contract
//!
//! Units are queued to a worker task that awaits the sink and only then
//! signals the unit's completion, so the router never moves past a unit the
//! sink has not finished writing.

use std::sync::Arc;

use contracts::{AsyncSink, Backend, Completion, ContractError, LogEntry, Unit};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, instrument, warn};

use crate::metrics::SinkMetrics;

struct Job {
    unit: Unit,
    done: Completion,
}

/// Handle to a running sink worker
pub struct SinkHandle {
    /// Sink name
    name: String,
    /// Channel to the worker; `None` after shutdown
    tx: Mutex<Option<mpsc::Sender<Job>>>,
    /// Shared metrics
    metrics: Arc<SinkMetrics>,
    /// Worker task handle
    worker_handle: Mutex<Option<JoinHandle<()>>>,
}

impl SinkHandle {
    /// Create a new SinkHandle and spawn the worker task
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn<S: AsyncSink + Send + 'static>(sink: S, queue_capacity: usize) -> Self {
        let name = sink.name().to_string();
        let (tx, rx) = mpsc::channel(queue_capacity.max(1));
        let metrics = Arc::new(SinkMetrics::new());

        let worker_metrics = Arc::clone(&metrics);
        let worker_name = name.clone();

        let worker_handle = tokio::spawn(async move {
            sink_worker(sink, rx, worker_metrics, worker_name).await;
        });

        Self {
            name,
            tx: Mutex::new(Some(tx)),
            metrics,
            worker_handle: Mutex::new(Some(worker_handle)),
        }
    }

    /// Get sink name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get current metrics
    pub fn metrics(&self) -> &Arc<SinkMetrics> {
        &self.metrics
    }

    /// Queue a unit for the worker (non-blocking)
    ///
    /// On rejection the completion is discarded unsignalled and an error is
    /// returned, as the backend contract requires.
    pub fn try_send(&self, unit: Unit, done: Completion) -> Result<(), ContractError> {
        let guard = self.tx.lock();
        let Some(tx) = guard.as_ref() else {
            done.abandon();
            return Err(ContractError::backend_failure(&self.name, "sink is shut down"));
        };

        match tx.try_send(Job { unit, done }) {
            Ok(()) => {
                self.metrics
                    .set_queue_len(tx.max_capacity() - tx.capacity());
                Ok(())
            }
            Err(mpsc::error::TrySendError::Full(job)) => {
                job.done.abandon();
                self.metrics.inc_failure_count();
                warn!(sink = %self.name, unit = job.unit.label(), "Queue full, unit rejected");
                Err(ContractError::backend_failure(&self.name, "queue full"))
            }
            Err(mpsc::error::TrySendError::Closed(job)) => {
                job.done.abandon();
                error!(sink = %self.name, "Sink worker closed unexpectedly");
                Err(ContractError::backend_failure(&self.name, "sink worker closed"))
            }
        }
    }

    /// Shutdown the sink worker gracefully
    ///
    /// Units already queued are still written and completed.
    #[instrument(name = "sink_handle_shutdown", skip(self), fields(sink = %self.name))]
    pub async fn shutdown(&self) {
        // Drop sender to signal worker to stop
        drop(self.tx.lock().take());

        let worker = self.worker_handle.lock().take();
        if let Some(worker) = worker {
            if let Err(e) = worker.await {
                error!(sink = %self.name, error = ?e, "Worker task panicked");
            }
        }
        debug!(sink = %self.name, "SinkHandle shutdown complete");
    }
}

impl Backend for SinkHandle {
    fn push(&self, entry: &LogEntry, done: Completion) -> Result<(), ContractError> {
        self.try_send(Unit::entry(entry.clone()), done)
    }

    fn group(&self, name: &str, done: Completion) -> Result<(), ContractError> {
        self.try_send(Unit::group_open(name), done)
    }

    fn group_end(&self, done: Completion) -> Result<(), ContractError> {
        self.try_send(Unit::GroupEnd, done)
    }
}

/// Worker task that consumes units, writes them and signals completion
#[instrument(
    name = "sink_worker_loop",
    skip(sink, rx, metrics),
    fields(sink = %name)
)]
async fn sink_worker<S: AsyncSink>(
    mut sink: S,
    mut rx: mpsc::Receiver<Job>,
    metrics: Arc<SinkMetrics>,
    name: String,
) {
    debug!(sink = %name, "Sink worker started");

    while let Some(Job { unit, done }) = rx.recv().await {
        metrics.set_queue_len(rx.len());

        match sink.write(&unit).await {
            Ok(()) => {
                metrics.inc_write_count();
            }
            Err(e) => {
                metrics.inc_failure_count();
                error!(
                    sink = %name,
                    unit = unit.label(),
                    error = %e,
                    "Write failed"
                );
                // Delivery continues past a failed write
            }
        }

        if let Err(e) = done.complete() {
            error!(sink = %name, error = %e, "Delivery after completion failed");
        }
    }

    // Cleanup
    if let Err(e) = sink.flush().await {
        error!(sink = %name, error = %e, "Flush failed on shutdown");
    }
    if let Err(e) = sink.close().await {
        error!(sink = %name, error = %e, "Close failed on shutdown");
    }

    debug!(sink = %name, "Sink worker stopped");
}
