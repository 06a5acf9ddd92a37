//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use observability::{LogWriter, ObservabilityConfig};
use std::path::PathBuf;

/// logrelay - ordered, group-aware log routing
#[derive(Parser, Debug)]
#[command(
    name = "logrelay",
    author,
    version,
    about = "Route structured log entries to configured backends",
    long_about = "Routes log entries from named producers to every configured backend.\n\n\
                  Groups opened by a producer are delivered as one contiguous block, and \n\
                  each backend finishes a unit before the next backend receives it."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "LOGRELAY_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "LOGRELAY_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Logging setup for this invocation
    ///
    /// Logs go to stderr so that console backends own stdout. `-q` pins the
    /// level to warn; otherwise `RUST_LOG` wins over `-v`.
    pub fn observability_config(&self) -> ObservabilityConfig {
        let default_log_level = if self.quiet {
            "warn"
        } else {
            match self.verbose {
                0 => "info",
                1 => "debug",
                _ => "trace",
            }
        };
        ObservabilityConfig {
            log_format: self.log_format.clone().into(),
            writer: LogWriter::Stderr,
            default_log_level: default_log_level.to_string(),
            respect_env: !self.quiet,
            metrics_port: None,
        }
    }
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Replay JSON-lines producer operations through the router
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display configuration information
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(
        short,
        long,
        default_value = "logrelay.toml",
        env = "LOGRELAY_CONFIG"
    )]
    pub config: PathBuf,

    /// JSON-lines operations file (default: stdin)
    #[arg(short, long, env = "LOGRELAY_INPUT")]
    pub input: Option<PathBuf>,

    /// Override the application name from configuration
    #[arg(long, env = "LOGRELAY_APP")]
    pub app: Option<String>,

    /// Maximum number of operations to replay (0 = unlimited)
    #[arg(long, default_value = "0", env = "LOGRELAY_MAX_OPS")]
    pub max_ops: u64,

    /// Replay timeout in seconds (0 = no timeout)
    #[arg(long, default_value = "0", env = "LOGRELAY_TIMEOUT")]
    pub timeout: u64,

    /// Stop at the first malformed line or routing error
    #[arg(long)]
    pub strict: bool,

    /// Attach a captured call stack to every entry
    #[arg(long)]
    pub trace: bool,

    /// Validate configuration and exit without routing anything
    #[arg(long)]
    pub dry_run: bool,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "LOGRELAY_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "logrelay.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "logrelay.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Show backend parameters
    #[arg(long)]
    pub backends: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}
