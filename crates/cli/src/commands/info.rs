//! `info` command implementation.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use contracts::DispatcherBlueprint;
use serde::Serialize;
use tracing::info;

use crate::cli::InfoArgs;
use crate::error::ensure_config_exists;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    batcher: BatcherInfo,
    processor: ProcessorInfo,
}

#[derive(Serialize)]
struct BatcherInfo {
    batch_size: usize,
    queue_capacity: usize,
    wait_ms: u64,
    /// Upper bound for a timeout batch to be handed off
    max_dispatch_delay_ms: u64,
}

#[derive(Serialize)]
struct ProcessorInfo {
    name: String,
    processor_type: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    params: BTreeMap<String, String>,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    ensure_config_exists(&args.config)?;

    let blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    if args.json {
        let info = build_config_info(&blueprint);
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&blueprint);
    }

    Ok(())
}

fn build_config_info(blueprint: &DispatcherBlueprint) -> ConfigInfo {
    let batcher = &blueprint.batcher;
    ConfigInfo {
        version: format!("{:?}", blueprint.version),
        batcher: BatcherInfo {
            batch_size: batcher.batch_size,
            queue_capacity: batcher.queue_capacity,
            wait_ms: batcher.wait_ms,
            max_dispatch_delay_ms: batcher.wait_ms.saturating_mul(2),
        },
        processor: ProcessorInfo {
            name: blueprint.processor.name.clone(),
            processor_type: format!("{:?}", blueprint.processor.processor_type),
            params: blueprint
                .processor
                .params
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        },
    }
}

fn print_config_info(blueprint: &DispatcherBlueprint) {
    let info = build_config_info(blueprint);

    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║                 dnsbatch Configuration                       ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    println!("⚙️  Batcher");
    println!("   ├─ Version: {}", info.version);
    println!("   ├─ Batch size: {}", info.batcher.batch_size);
    println!("   ├─ Queue capacity: {}", info.batcher.queue_capacity);
    println!("   ├─ Wait: {} ms", info.batcher.wait_ms);
    println!(
        "   └─ Max dispatch delay: < {} ms",
        info.batcher.max_dispatch_delay_ms
    );

    println!("\n📤 Processor");
    let has_params = !info.processor.params.is_empty();
    let prefix = if has_params { "├─" } else { "└─" };
    println!(
        "   {} {} ({})",
        prefix, info.processor.name, info.processor.processor_type
    );
    for (i, (key, value)) in info.processor.params.iter().enumerate() {
        let is_last = i == info.processor.params.len() - 1;
        let prefix = if is_last { "└─" } else { "├─" };
        println!("   {} {} = {}", prefix, key, value);
    }

    println!();
}
