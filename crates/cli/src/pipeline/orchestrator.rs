//! Relay orchestrator - replays producer operations through a router.

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use contracts::RouterBlueprint;
use dispatcher::{create_manager, Manager, Router};
use observability::{
    record_dispatch_stats, record_op_received, record_sink_snapshot, record_submit_latency_ms,
};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, info, warn};

use super::{Op, RelayStats};
use crate::error::CliError;

/// Relay configuration
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Router configuration
    pub blueprint: RouterBlueprint,

    /// Maximum number of operations to replay (None = unlimited)
    pub max_ops: Option<u64>,

    /// Replay timeout (None = no timeout)
    pub timeout: Option<Duration>,

    /// Abort on the first malformed line or routing error
    pub strict: bool,

    /// Attach call stacks to entries
    pub capture_trace: bool,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,
}

/// Main relay orchestrator
pub struct Relay {
    config: RelayConfig,
}

impl Relay {
    /// Create a new relay with the given configuration
    pub fn new(config: RelayConfig) -> Self {
        Self { config }
    }

    /// Replay every operation from `input`, then shut the router down
    pub async fn run<R>(self, input: R) -> Result<RelayStats>
    where
        R: AsyncBufRead + Unpin,
    {
        let start_time = Instant::now();

        // Initialize Metrics (optional)
        if let Some(port) = self.config.metrics_port {
            observability::init_metrics_only(port)?;
            info!("Metrics endpoint available on port {}", port);
        }

        let router = create_manager(&self.config.blueprint)
            .await
            .context("Failed to create router")?;

        info!(
            app = %router.manager().name(),
            backends = ?router.manager().backend_names(),
            "Router ready"
        );

        let mut stats = RelayStats {
            active_backends: router.manager().backend_names().len(),
            ..RelayStats::default()
        };

        let replay = self.replay(router.manager(), input, &mut stats);
        let outcome = match self.config.timeout {
            Some(limit) => match tokio::time::timeout(limit, replay).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    warn!(timeout_secs = limit.as_secs(), "Replay timed out");
                    Ok(())
                }
            },
            None => replay.await,
        };

        self.finish(router, &mut stats).await;
        stats.duration = start_time.elapsed();

        outcome?;
        Ok(stats)
    }

    async fn replay<R>(
        &self,
        manager: &Manager,
        input: R,
        stats: &mut RelayStats,
    ) -> Result<(), CliError>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut lines = input.lines();
        let mut line_no: u64 = 0;

        while let Some(line) = lines.next_line().await? {
            line_no += 1;

            if let Some(max) = self.config.max_ops {
                if stats.ops_applied >= max {
                    info!(max_ops = max, "Operation limit reached");
                    break;
                }
            }

            let op = match Op::parse_line(&line) {
                None => continue,
                Some(Ok(op)) => op,
                Some(Err(e)) => {
                    stats.malformed += 1;
                    let err = CliError::malformed_op(line_no, e.to_string());
                    if self.config.strict {
                        return Err(err);
                    }
                    warn!(error = %err, "Skipping line");
                    continue;
                }
            };

            if let Err(source) = self.apply(manager, &op, stats) {
                stats.routing_errors += 1;
                let err = CliError::routing(line_no, source);
                if self.config.strict {
                    return Err(err);
                }
                warn!(error = %err, "Operation failed");
            }

            stats.ops_applied += 1;
            let snapshot = manager.metrics();
            stats.metrics.update(&snapshot);
            if self.config.metrics_port.is_some() {
                record_dispatch_stats(&snapshot);
            }

            if stats.ops_applied.is_multiple_of(1000) {
                debug!(ops = stats.ops_applied, "Relay progress");
            }
        }

        Ok(())
    }

    fn apply(
        &self,
        manager: &Manager,
        op: &Op,
        stats: &mut RelayStats,
    ) -> Result<(), contracts::ContractError> {
        record_op_received(op.name());

        match op {
            Op::Entry { .. } => {
                let Some(mut entry) = op.to_entry() else {
                    return Ok(());
                };
                let env = manager.environment();
                entry.timestamp = Some(env.timestamp());
                if self.config.capture_trace {
                    entry.trace = env.trace();
                }

                let started = Instant::now();
                let result = manager.submit(entry);
                let latency_ms = started.elapsed().as_secs_f64() * 1000.0;
                stats.metrics.record_submit_latency_ms(latency_ms);
                if self.config.metrics_port.is_some() {
                    record_submit_latency_ms(latency_ms);
                }

                stats.entries += 1;
                result
            }
            Op::Group { logger, name } => {
                manager.open_group(logger, name.clone());
                stats.groups_opened += 1;
                Ok(())
            }
            Op::GroupEnd { logger } => {
                manager.close_group(logger)?;
                stats.groups_closed += 1;
                Ok(())
            }
        }
    }

    /// Drain pending deliveries, collect sink metrics and stop the sinks
    async fn finish(&self, router: Router, stats: &mut RelayStats) {
        router.settle().await;

        let status = router.manager().status();
        if status.open_groups > 0 {
            warn!(
                open_groups = status.open_groups,
                "Input ended with open groups; their entries were not delivered"
            );
        }
        if status.queued_items > 0 {
            warn!(queued = status.queued_items, "Input ended with undelivered items");
        }

        stats.metrics.update(&router.manager().metrics());
        for (name, snapshot) in router.sink_metrics() {
            stats.metrics.record_sink_failures(&name, snapshot.failure_count);
            if self.config.metrics_port.is_some() {
                record_sink_snapshot(
                    &name,
                    snapshot.write_count,
                    snapshot.failure_count,
                    snapshot.queue_len,
                );
            }
        }

        router.shutdown().await;
    }
}
