//! `run` command implementation.

use anyhow::{Context, Result};
use config_loader::{BatcherOverrides, ConfigLoader};
use contracts::DispatcherBlueprint;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::cli::RunArgs;
use crate::error::{ensure_config_exists, CliError};
use crate::pipeline::{Pipeline, PipelineConfig};

/// Execute the `run` command
pub async fn run_pipeline(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    ensure_config_exists(&args.config)?;

    // Load configuration with CLI overrides applied
    let overrides = BatcherOverrides {
        batch_size: args.batch_size,
        queue_capacity: args.queue_capacity,
        wait_ms: args.wait_ms,
    };
    if !overrides.is_empty() {
        info!(?overrides, "Applying batcher overrides from CLI");
    }
    let blueprint = ConfigLoader::load_with_overrides(&args.config, &overrides)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    info!(
        batch_size = blueprint.batcher.batch_size,
        queue_capacity = blueprint.batcher.queue_capacity,
        wait_ms = blueprint.batcher.wait_ms,
        processor = %blueprint.processor.name,
        "Configuration loaded"
    );

    // Dry run - just validate and exit
    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&blueprint);
        return Ok(());
    }

    if args.producers == 0 {
        return Err(CliError::invalid_args("--producers must be >= 1").into());
    }
    if !(args.rate.is_finite() && args.rate > 0.0) {
        return Err(CliError::invalid_args("--rate must be a positive number").into());
    }

    let pipeline_config = PipelineConfig {
        blueprint,
        producers: args.producers,
        rate_hz: args.rate,
        duration: (args.duration > 0).then(|| Duration::from_secs(args.duration)),
        metrics_port: (args.metrics_port > 0).then_some(args.metrics_port),
    };

    // Ctrl+C / SIGTERM cancel the root scope; the pipeline winds down from there
    let scope = CancellationToken::new();
    let signal_task = tokio::spawn(cancel_on_shutdown_signal(scope.clone()));

    info!("Starting pipeline...");
    let stats = Pipeline::new(pipeline_config)
        .run(scope)
        .await
        .context("Pipeline execution failed")?;
    signal_task.abort();

    info!(
        transactions = stats.transactions_produced,
        batches = stats.dispatcher.batches_dispatched(),
        duration_secs = stats.duration.as_secs_f64(),
        tps = format!("{:.2}", stats.tps()),
        "Pipeline completed"
    );
    stats.print_summary();

    info!("dnsbatch finished");
    Ok(())
}

/// Cancel `scope` on Ctrl+C or SIGTERM
async fn cancel_on_shutdown_signal(scope: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
        _ = scope.cancelled() => return,
    }

    warn!("Received shutdown signal, stopping pipeline...");
    scope.cancel();
}

/// Print configuration summary for dry-run mode
fn print_config_summary(blueprint: &DispatcherBlueprint) {
    println!("\n=== Configuration Summary ===\n");
    println!("Batcher:");
    println!("  Batch size: {}", blueprint.batcher.batch_size);
    println!("  Queue capacity: {}", blueprint.batcher.queue_capacity);
    println!("  Wait: {} ms", blueprint.batcher.wait_ms);
    println!("\nProcessor:");
    println!(
        "  {} ({:?})",
        blueprint.processor.name, blueprint.processor.processor_type
    );
    for (key, value) in &blueprint.processor.params {
        println!("  {key} = {value}");
    }
    println!();
}
