//! # Observability
//!
//! Logging setup and metric export for logrelay processes.
//!
//! - [`init_with_config`] installs the global `tracing` subscriber (JSON,
//!   pretty or compact) and, optionally, the Prometheus exporter
//! - [`metrics`] turns router and sink snapshots into `logrelay_*` series
//!
//! ```ignore
//! observability::init_with_config(ObservabilityConfig {
//!     writer: LogWriter::Stderr,
//!     ..Default::default()
//! })?;
//! observability::record_dispatch_stats(&manager.metrics());
//! ```

pub mod metrics;

use anyhow::{Context, Result};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

pub use crate::metrics::{
    record_dispatch_stats, record_op_received, record_sink_snapshot, record_submit_latency_ms,
    MetricsSummary, RoutingMetricsAggregator, RunningStats, StatsSummary,
};

/// Subscriber and exporter settings
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    pub log_format: LogFormat,
    pub writer: LogWriter,
    /// Filter directive used when `RUST_LOG` is unset or ignored
    pub default_log_level: String,
    /// Let `RUST_LOG` override `default_log_level`
    pub respect_env: bool,
    /// Prometheus listener port, `None` disables the exporter
    pub metrics_port: Option<u16>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_format: LogFormat::Json,
            writer: LogWriter::Stdout,
            default_log_level: "info".to_string(),
            respect_env: true,
            metrics_port: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// One JSON object per event
    #[default]
    Json,
    Pretty,
    /// Single line per event
    Compact,
}

/// Stream the fmt layer writes to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogWriter {
    #[default]
    Stdout,
    /// Keeps stdout free for console backends
    Stderr,
}

impl LogWriter {
    fn make_writer(self) -> BoxMakeWriter {
        match self {
            Self::Stdout => BoxMakeWriter::new(std::io::stdout),
            Self::Stderr => BoxMakeWriter::new(std::io::stderr),
        }
    }
}

/// Filter for `config`: `RUST_LOG` when allowed and set, else the default level
pub fn env_filter(config: &ObservabilityConfig) -> EnvFilter {
    if config.respect_env {
        if let Ok(filter) = EnvFilter::try_from_default_env() {
            return filter;
        }
    }
    EnvFilter::new(&config.default_log_level)
}

/// Install the global subscriber and, if a port is set, the Prometheus exporter
///
/// # Errors
/// Fails when a global subscriber or metrics recorder is already installed,
/// or the exporter cannot bind its port.
pub fn init_with_config(config: ObservabilityConfig) -> Result<()> {
    let writer = config.writer.make_writer();
    let fmt_layer = match config.log_format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_writer(writer)
            .with_target(true)
            .with_thread_ids(true)
            .with_thread_names(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        LogFormat::Pretty => fmt::layer().pretty().with_writer(writer).boxed(),
        LogFormat::Compact => fmt::layer().compact().with_writer(writer).boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter(&config))
        .with(fmt_layer)
        .try_init()
        .context("Failed to initialize tracing subscriber")?;

    if let Some(port) = config.metrics_port {
        init_metrics_only(port)?;
    }

    tracing::debug!(
        log_format = ?config.log_format,
        writer = ?config.writer,
        metrics_port = ?config.metrics_port,
        "Observability initialized"
    );
    Ok(())
}

/// Install only the Prometheus exporter, for processes whose subscriber is
/// already set up
pub fn init_metrics_only(port: u16) -> Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], port))
        .install()
        .context("Failed to install Prometheus recorder")?;

    tracing::info!(port, "Prometheus metrics endpoint initialized");
    Ok(())
}
