//! Ingestion metrics

use std::sync::atomic::{AtomicU64, Ordering};

use metrics::counter;

/// Ingestion metrics, shareable across producers
#[derive(Debug, Default)]
pub struct IngestionMetrics {
    /// Total transactions generated
    pub transactions_produced: AtomicU64,

    /// Generated transactions whose status is not `Complete`
    pub transactions_failed: AtomicU64,

    /// Transactions that could not be delivered (receiver gone)
    pub send_failures: AtomicU64,
}

impl IngestionMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a generated transaction
    pub fn record_produced(&self, source_id: &str, success: bool) {
        self.transactions_produced.fetch_add(1, Ordering::Relaxed);
        if !success {
            self.transactions_failed.fetch_add(1, Ordering::Relaxed);
        }
        counter!(
            "dnsbatch_transactions_produced_total",
            "source" => source_id.to_string()
        )
        .increment(1);
    }

    /// Record a transaction the receiver never got
    pub fn record_send_failure(&self) {
        self.send_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            transactions_produced: self.transactions_produced.load(Ordering::Relaxed),
            transactions_failed: self.transactions_failed.load(Ordering::Relaxed),
            send_failures: self.send_failures.load(Ordering::Relaxed),
        }
    }
}

/// Metrics snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub transactions_produced: u64,
    pub transactions_failed: u64,
    pub send_failures: u64,
}
