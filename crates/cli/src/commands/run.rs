//! `run` command implementation.

use anyhow::{Context, Result};
use std::time::Duration;
use tokio::io::{AsyncBufRead, BufReader};
use tracing::{info, warn};

use crate::cli::RunArgs;
use crate::error::CliError;
use crate::pipeline::{Relay, RelayConfig};

/// Execute the `run` command
pub async fn run_relay(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    // Validate config path
    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    // Load and parse configuration
    let mut blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    // Apply CLI overrides
    if let Some(ref app) = args.app {
        info!(app = %app, "Overriding application name from CLI");
        blueprint.app_name = app.clone();
    }

    info!(
        app = %blueprint.app_name,
        scheduler = ?blueprint.scheduler,
        backends = blueprint.backends.len(),
        "Configuration loaded"
    );

    // Dry run - just validate and exit
    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&blueprint);
        return Ok(());
    }

    let relay_config = RelayConfig {
        blueprint,
        max_ops: if args.max_ops == 0 {
            None
        } else {
            Some(args.max_ops)
        },
        timeout: if args.timeout == 0 {
            None
        } else {
            Some(Duration::from_secs(args.timeout))
        },
        strict: args.strict,
        capture_trace: args.trace,
        metrics_port: if args.metrics_port == 0 {
            None
        } else {
            Some(args.metrics_port)
        },
    };

    let input = open_input(args).await?;
    let relay = Relay::new(relay_config);

    // Setup graceful shutdown handler
    let shutdown_signal = setup_shutdown_signal();

    info!("Starting relay...");

    tokio::select! {
        result = relay.run(input) => {
            match result {
                Ok(stats) => {
                    info!(
                        ops = stats.ops_applied,
                        entries = stats.entries,
                        errors = stats.routing_errors + stats.malformed,
                        duration_secs = stats.duration.as_secs_f64(),
                        ops_per_sec = format!("{:.2}", stats.ops_per_sec()),
                        "Relay completed"
                    );

                    // Print detailed statistics
                    stats.print_summary();
                }
                Err(e) => {
                    return Err(e).context("Relay failed");
                }
            }
        }
        result = shutdown_signal => {
            result?;
            warn!("Received shutdown signal, stopping relay...");
        }
    }

    info!("logrelay finished");
    Ok(())
}

/// Open the operations stream: the `--input` file, or stdin
async fn open_input(args: &RunArgs) -> Result<Box<dyn AsyncBufRead + Unpin + Send>, CliError> {
    match &args.input {
        Some(path) => {
            let file = tokio::fs::File::open(path)
                .await
                .map_err(|e| CliError::input_open(path.display().to_string(), e.to_string()))?;
            info!(input = %path.display(), "Reading operations from file");
            Ok(Box::new(BufReader::new(file)))
        }
        None => {
            info!("Reading operations from stdin");
            Ok(Box::new(BufReader::new(tokio::io::stdin())))
        }
    }
}

/// Setup Ctrl+C and SIGTERM signal handlers
async fn setup_shutdown_signal() -> Result<()> {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .context("Failed to install Ctrl+C handler")
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .context("Failed to install SIGTERM handler")?
            .recv()
            .await;
        Ok::<(), anyhow::Error>(())
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<Result<()>>();

    tokio::select! {
        result = ctrl_c => result,
        result = terminate => result,
    }
}

/// Print configuration summary for dry-run mode
fn print_config_summary(blueprint: &contracts::RouterBlueprint) {
    println!("\n=== Configuration Summary ===\n");
    println!("Application: {}", blueprint.app_name);
    println!("Scheduler: {:?}", blueprint.scheduler);

    if blueprint.backends.is_empty() {
        println!("\nBackends: none (entries are consumed without delivery)");
    } else {
        println!("\nBackends ({}):", blueprint.backends.len());
        for backend in &blueprint.backends {
            println!("  - {} ({:?})", backend.name, backend.backend_type);
        }
    }

    println!();
}
