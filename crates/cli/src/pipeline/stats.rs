//! Pipeline statistics and metrics.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use contracts::{Batch, BatchProcessor, ContractError};
use dispatcher::MetricsSnapshot;
use observability::{BatchStatsAggregator, BatchStatsSummary};

/// Statistics from a pipeline run
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    /// Total duration of the pipeline run
    pub duration: Duration,

    /// Number of producers that were active
    pub producers: usize,

    /// Transactions generated by all producers
    pub transactions_produced: u64,

    /// Dispatcher counters at shutdown
    pub dispatcher: MetricsSnapshot,

    /// Per-batch size and latency statistics
    pub batch_stats: BatchStatsSummary,
}

impl PipelineStats {
    /// Transactions per second
    pub fn tps(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.transactions_produced as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Share of dispatched batches evicted from the hand-off queue, in percent
    pub fn drop_rate(&self) -> f64 {
        let total = self.dispatcher.batches_dispatched();
        if total > 0 {
            (self.dispatcher.dropped_count as f64 / total as f64) * 100.0
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        let d = &self.dispatcher;

        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                    Pipeline Statistics                       ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        println!("📊 Overview");
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Producers: {}", self.producers);
        println!("   ├─ Transactions: {}", self.transactions_produced);
        println!("   └─ TPS: {:.2}", self.tps());

        println!("\n📦 Dispatcher");
        println!("   ├─ Items added: {}", d.items_added);
        println!("   ├─ Size-triggered batches: {}", d.size_batches);
        println!("   ├─ Timeout-triggered batches: {}", d.timeout_batches);
        println!("   ├─ Processed: {}", d.processed_count);
        println!("   ├─ Processor failures: {}", d.failure_count);
        println!(
            "   ├─ Dropped (queue full): {} ({:.2}%)",
            d.dropped_count,
            self.drop_rate()
        );
        println!("   ├─ Stale timeout signals: {}", d.stale_signals);
        println!("   └─ Discarded at shutdown: {}", d.discarded_items);

        println!("\n📈 Batches");
        println!("   ├─ Size: {}", self.batch_stats.batch_size);
        println!("   └─ Latency (ms): {}", self.batch_stats.latency_ms);

        println!();
    }
}

/// Wraps a processor and feeds every batch it sees into a stats aggregator
pub struct StatsProcessor<P> {
    inner: P,
    stats: Arc<Mutex<BatchStatsAggregator>>,
}

impl<P> StatsProcessor<P> {
    pub fn new(inner: P, stats: Arc<Mutex<BatchStatsAggregator>>) -> Self {
        Self { inner, stats }
    }

    fn record<T>(&self, batch: &Batch<T>) {
        let latency_ms = batch.opened_at.elapsed().as_secs_f64() * 1000.0;
        self.stats
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .update(batch.trigger, batch.len(), latency_ms);
    }
}

impl<T, P> BatchProcessor<T> for StatsProcessor<P>
where
    T: Sync,
    P: BatchProcessor<T>,
{
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn process(&mut self, batch: &Batch<T>) -> Result<(), ContractError> {
        self.record(batch);
        self.inner.process(batch).await
    }

    async fn close(&mut self) -> Result<(), ContractError> {
        self.inner.close().await
    }
}
