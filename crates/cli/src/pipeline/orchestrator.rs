//! Pipeline orchestrator - mock producers feeding one dispatcher.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use contracts::{DispatcherBlueprint, DnsTransaction};
use dispatcher::{create_processor, BatchDispatcher};
use ingestion::{IngestionMetrics, MockTransactionConfig, MockTransactionSource};
use observability::BatchStatsAggregator;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{PipelineStats, StatsProcessor};
use crate::error::CliError;

/// Per-producer channel capacity
const PRODUCER_CHANNEL_CAPACITY: usize = 256;

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Validated dispatcher blueprint
    pub blueprint: DispatcherBlueprint,

    /// Number of concurrent producers
    pub producers: usize,

    /// Transactions per second, per producer
    pub rate_hz: f64,

    /// Run duration (None = until the scope is cancelled)
    pub duration: Option<Duration>,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,
}

/// Main pipeline orchestrator
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Run until `scope` is cancelled or the configured duration elapses
    ///
    /// Either way the scope ends up cancelled, which tears the dispatcher down.
    pub async fn run(self, scope: CancellationToken) -> Result<PipelineStats> {
        let start_time = Instant::now();
        let blueprint = &self.config.blueprint;

        // Initialize Metrics (optional)
        if let Some(port) = self.config.metrics_port {
            observability::init_metrics_only(port)?;
            info!("Metrics endpoint available on port {}", port);
        }

        // Setup Dispatcher
        let batch_stats = Arc::new(Mutex::new(BatchStatsAggregator::new()));
        let processor = create_processor(&blueprint.processor)
            .context("Failed to create processor")?;
        let processor = StatsProcessor::new(processor, Arc::clone(&batch_stats));

        let dispatcher: BatchDispatcher<DnsTransaction> =
            BatchDispatcher::spawn(&scope, processor, blueprint.batcher)
                .map_err(|e| CliError::pipeline_execution(e.to_string()))?;

        info!(
            processor = %blueprint.processor.name,
            producers = self.config.producers,
            rate_hz = self.config.rate_hz,
            "Dispatcher started"
        );

        // Start Producers
        let ingestion_metrics = Arc::new(IngestionMetrics::new());
        let mut sources = Vec::with_capacity(self.config.producers);
        let mut forwarders = Vec::with_capacity(self.config.producers);

        for id in 0..self.config.producers {
            let source = MockTransactionSource::new(MockTransactionConfig {
                source_id: format!("producer-{id}"),
                frequency_hz: self.config.rate_hz,
                ..Default::default()
            });
            let rx = source
                .start(PRODUCER_CHANNEL_CAPACITY, Some(Arc::clone(&ingestion_metrics)))
                .with_context(|| format!("Failed to start producer-{id}"))?;

            forwarders.push(spawn_forwarder(rx, dispatcher.clone(), scope.clone()));
            sources.push(source);
        }

        // Wait for the stop condition
        match self.config.duration {
            Some(duration) => {
                info!(duration_secs = duration.as_secs(), "Pipeline running");
                tokio::select! {
                    _ = tokio::time::sleep(duration) => {
                        info!("Run duration elapsed");
                    }
                    _ = scope.cancelled() => {}
                }
            }
            None => {
                info!("Pipeline running until interrupted");
                scope.cancelled().await;
            }
        }

        // Shutdown
        info!("Shutting down pipeline...");
        scope.cancel();
        for source in &sources {
            source.stop();
        }
        for forwarder in forwarders {
            if let Err(e) = forwarder.await {
                warn!(error = %e, "Producer forwarder panicked");
            }
        }
        dispatcher.shutdown().await;

        let batch_stats = batch_stats
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .summary();

        let stats = PipelineStats {
            duration: start_time.elapsed(),
            producers: self.config.producers,
            transactions_produced: ingestion_metrics.snapshot().transactions_produced,
            dispatcher: dispatcher.snapshot(),
            batch_stats,
        };

        info!(
            duration_secs = stats.duration.as_secs_f64(),
            tps = format!("{:.2}", stats.tps()),
            "Pipeline shutdown complete"
        );

        Ok(stats)
    }
}

/// Move transactions from one producer into the dispatcher
fn spawn_forwarder(
    mut rx: tokio::sync::mpsc::Receiver<DnsTransaction>,
    dispatcher: BatchDispatcher<DnsTransaction>,
    scope: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = scope.cancelled() => break,
                transaction = rx.recv() => match transaction {
                    Some(transaction) => dispatcher.add(transaction),
                    None => break,
                },
            }
        }
        debug!("Producer forwarder stopped");
    })
}
