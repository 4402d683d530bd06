//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::DispatcherBlueprint;
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
    batch_size: usize,
    queue_capacity: usize,
    wait_ms: u64,
    processor: String,
    processor_type: String,
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

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(blueprint) => {
            let warnings = collect_warnings(&blueprint);
            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: (!warnings.is_empty()).then_some(warnings),
                summary: Some(ConfigSummary {
                    version: format!("{:?}", blueprint.version),
                    batch_size: blueprint.batcher.batch_size,
                    queue_capacity: blueprint.batcher.queue_capacity,
                    wait_ms: blueprint.batcher.wait_ms,
                    processor: blueprint.processor.name.clone(),
                    processor_type: format!("{:?}", blueprint.processor.processor_type),
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
fn collect_warnings(blueprint: &DispatcherBlueprint) -> Vec<String> {
    let mut warnings = Vec::new();
    let batcher = &blueprint.batcher;

    if batcher.batch_size == 1 {
        warnings.push(
            "batcher.batch_size is 1 - every item is dispatched alone and the wait never applies"
                .to_string(),
        );
    }

    if batcher.queue_capacity == 1 {
        warnings.push(
            "batcher.queue_capacity is 1 - any slow batch causes the next one to be dropped"
                .to_string(),
        );
    }

    if batcher.wait_ms < 10 {
        warnings.push(format!(
            "batcher.wait_ms is {} - timeout batches will be very small",
            batcher.wait_ms
        ));
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Batch size: {}", summary.batch_size);
            println!("  Queue capacity: {}", summary.queue_capacity);
            println!("  Wait: {} ms", summary.wait_ms);
            println!(
                "  Processor: {} ({})",
                summary.processor, summary.processor_type
            );
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
