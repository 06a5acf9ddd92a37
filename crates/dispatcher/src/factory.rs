//! Router construction from a blueprint

use std::sync::Arc;

use contracts::{BackendConfig, BackendType, RouterBlueprint};
use tracing::{debug, info, instrument};

use crate::error::DispatcherError;
use crate::handle::SinkHandle;
use crate::manager::{Manager, ManagerBuilder};
use crate::metrics::MetricsSnapshot;
use crate::scheduler::scheduler_from_config;
use crate::sinks::{ConsoleBackend, FileSink, TracingBackend};

/// A configured manager plus the async sink workers it delivers to
pub struct Router {
    manager: Manager,
    handles: Vec<Arc<SinkHandle>>,
}

impl Router {
    pub fn manager(&self) -> &Manager {
        &self.manager
    }

    /// Get metrics for all async sinks
    pub fn sink_metrics(&self) -> Vec<(String, MetricsSnapshot)> {
        self.handles
            .iter()
            .map(|h| (h.name().to_string(), h.metrics().snapshot()))
            .collect()
    }

    /// Wait until no drain cycle is running
    pub async fn settle(&self) {
        self.manager.wait_idle().await;
    }

    /// Let pending deliveries finish, then stop every sink worker
    #[instrument(name = "router_shutdown", skip(self), fields(app = %self.manager.name()))]
    pub async fn shutdown(self) {
        self.settle().await;
        for handle in &self.handles {
            handle.shutdown().await;
        }
        info!("Router shutdown complete");
    }
}

/// Build a manager and its backends from configuration
///
/// Must be called from within a tokio runtime; file backends run on worker
/// tasks.
#[instrument(
    name = "create_manager",
    skip(blueprint),
    fields(app = %blueprint.app_name, backend_count = blueprint.backends.len())
)]
pub async fn create_manager(blueprint: &RouterBlueprint) -> Result<Router, DispatcherError> {
    let scheduler = scheduler_from_config(&blueprint.scheduler)?;
    let mut builder = ManagerBuilder::new(&blueprint.app_name).shared_scheduler(scheduler);
    let mut handles = Vec::new();

    for config in &blueprint.backends {
        builder = register_backend(builder, config, &mut handles).await?;
    }

    let manager = builder.build()?;
    info!(backends = ?manager.backend_names(), "Router created");
    Ok(Router { manager, handles })
}

#[instrument(
    name = "create_backend",
    skip(builder, config, handles),
    fields(backend = %config.name, backend_type = ?config.backend_type)
)]
async fn register_backend(
    builder: ManagerBuilder,
    config: &BackendConfig,
    handles: &mut Vec<Arc<SinkHandle>>,
) -> Result<ManagerBuilder, DispatcherError> {
    debug!("Creating backend");
    let builder = match config.backend_type {
        BackendType::Console => builder.backend(&config.name, ConsoleBackend::new()),
        BackendType::Tracing => builder.backend(&config.name, TracingBackend::new(&config.name)),
        BackendType::File => {
            let sink = FileSink::from_params(&config.name, &config.params)
                .await
                .map_err(|e| DispatcherError::sink_creation(&config.name, e.to_string()))?;
            let handle = Arc::new(SinkHandle::spawn(sink, config.queue_capacity));
            handles.push(Arc::clone(&handle));
            builder.backend(&config.name, handle)
        }
    };
    Ok(builder)
}
