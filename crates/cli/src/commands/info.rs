//! `info` command implementation.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use contracts::{RouterBlueprint, SchedulerConfig};
use serde::Serialize;
use tracing::info;

use crate::cli::InfoArgs;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    app_name: String,
    scheduler: SchedulerInfo,
    backends: Vec<BackendInfo>,
}

#[derive(Serialize)]
struct SchedulerInfo {
    kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    delay_ms: Option<u64>,
}

#[derive(Serialize)]
struct BackendInfo {
    name: String,
    backend_type: String,
    queue_capacity: usize,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    params: BTreeMap<String, String>,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    let blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    if args.json {
        let info = build_config_info(&blueprint, args);
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&blueprint, args);
    }

    Ok(())
}

fn build_config_info(blueprint: &RouterBlueprint, args: &InfoArgs) -> ConfigInfo {
    let scheduler = match blueprint.scheduler {
        SchedulerConfig::Inline => SchedulerInfo {
            kind: "inline".to_string(),
            delay_ms: None,
        },
        SchedulerConfig::Tokio { delay_ms } => SchedulerInfo {
            kind: "tokio".to_string(),
            delay_ms: Some(delay_ms),
        },
    };

    let backends = blueprint
        .backends
        .iter()
        .map(|b| BackendInfo {
            name: b.name.clone(),
            backend_type: format!("{:?}", b.backend_type),
            queue_capacity: b.queue_capacity,
            params: if args.backends {
                b.params.clone().into_iter().collect()
            } else {
                BTreeMap::new()
            },
        })
        .collect();

    ConfigInfo {
        version: format!("{:?}", blueprint.version),
        app_name: blueprint.app_name.clone(),
        scheduler,
        backends,
    }
}

fn print_config_info(blueprint: &RouterBlueprint, args: &InfoArgs) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║                  logrelay Configuration                      ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    println!("📍 Router");
    println!("   ├─ Version: {:?}", blueprint.version);
    println!("   ├─ Application: {}", blueprint.app_name);
    match blueprint.scheduler {
        SchedulerConfig::Inline => println!("   └─ Scheduler: inline"),
        SchedulerConfig::Tokio { delay_ms } => {
            println!("   └─ Scheduler: tokio (delay {} ms)", delay_ms)
        }
    }

    if blueprint.backends.is_empty() {
        println!("\n📤 Backends: none");
        println!();
        return;
    }

    println!("\n📤 Backends ({}, in delivery order)", blueprint.backends.len());
    for (i, backend) in blueprint.backends.iter().enumerate() {
        let is_last = i == blueprint.backends.len() - 1;
        let prefix = if is_last { "└─" } else { "├─" };
        let child_prefix = if is_last { "   " } else { "│  " };

        println!(
            "   {} {} ({:?}, queue {})",
            prefix, backend.name, backend.backend_type, backend.queue_capacity
        );

        if args.backends && !backend.params.is_empty() {
            let params: BTreeMap<_, _> = backend.params.iter().collect();
            for (j, (key, value)) in params.iter().enumerate() {
                let param_prefix = if j == params.len() - 1 { "└─" } else { "├─" };
                println!("   {}  {} {} = {}", child_prefix, param_prefix, key, value);
            }
        }
    }

    println!();
}
