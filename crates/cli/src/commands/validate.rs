//! `validate` command implementation.

use std::collections::HashMap;

use anyhow::{Context, Result};
use contracts::{BackendType, RouterBlueprint, SchedulerConfig};
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    app_name: String,
    scheduler: String,
    backend_count: usize,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    // Check file exists
    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    // Try to load and validate
    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(blueprint) => {
            let warnings = collect_warnings(&blueprint);

            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ConfigSummary {
                    version: format!("{:?}", blueprint.version),
                    app_name: blueprint.app_name.clone(),
                    scheduler: format!("{:?}", blueprint.scheduler),
                    backend_count: blueprint.backends.len(),
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(blueprint: &RouterBlueprint) -> Vec<String> {
    let mut warnings = Vec::new();

    if blueprint.backends.is_empty() {
        warnings.push("No backends configured - entries will be consumed without delivery".to_string());
    }

    // Two file backends appending to one file interleave their output
    let mut paths: HashMap<&str, &str> = HashMap::new();
    for backend in &blueprint.backends {
        if backend.backend_type != BackendType::File {
            continue;
        }
        if let Some(path) = backend.params.get("path") {
            if let Some(previous) = paths.insert(path.as_str(), backend.name.as_str()) {
                warnings.push(format!(
                    "Backends '{}' and '{}' both write to {}",
                    previous, backend.name, path
                ));
            }
        }
    }

    if let SchedulerConfig::Tokio { delay_ms } = blueprint.scheduler {
        // Each unit costs one delay per backend
        if delay_ms > 0 && !blueprint.backends.is_empty() {
            warnings.push(format!(
                "scheduler.delay_ms = {} delays every backend call; throughput is capped at ~{:.0} units/s",
                delay_ms,
                1000.0 / (delay_ms as f64 * (blueprint.backends.len() + 1) as f64)
            ));
        }
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Application: {}", summary.app_name);
            println!("  Scheduler: {}", summary.scheduler);
            println!("  Backends: {}", summary.backend_count);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
