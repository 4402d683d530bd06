//! Dispatcher metrics for observability

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use contracts::DispatchTrigger;

/// Counters shared by the serialized worker, the consumer and callers
#[derive(Debug, Default)]
pub struct DispatcherMetrics {
    /// Current hand-off queue length
    queue_len: AtomicUsize,
    /// Items appended to an accumulator
    items_added: AtomicU64,
    /// Batches closed because they reached `batch_size`
    size_batches: AtomicU64,
    /// Batches closed by the timeout monitor
    timeout_batches: AtomicU64,
    /// Batches the processor handled successfully
    processed_count: AtomicU64,
    /// Batches the processor failed on (error or panic)
    failure_count: AtomicU64,
    /// Batches evicted from a full hand-off queue
    dropped_count: AtomicU64,
    /// Timeout signals ignored because their generation was already dispatched
    stale_signals: AtomicU64,
    /// Items thrown away at or after shutdown
    discarded_items: AtomicU64,
}

impl DispatcherMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Get current queue length
    pub fn queue_len(&self) -> usize {
        self.queue_len.load(Ordering::Relaxed)
    }

    /// Set current queue length
    pub fn set_queue_len(&self, len: usize) {
        self.queue_len.store(len, Ordering::Relaxed);
    }

    pub fn items_added(&self) -> u64 {
        self.items_added.load(Ordering::Relaxed)
    }

    pub fn inc_items_added(&self) {
        self.items_added.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a swap for the given trigger
    pub fn inc_dispatched(&self, trigger: DispatchTrigger) {
        match trigger {
            DispatchTrigger::Size => self.size_batches.fetch_add(1, Ordering::Relaxed),
            DispatchTrigger::Timeout => self.timeout_batches.fetch_add(1, Ordering::Relaxed),
        };
    }

    pub fn size_batches(&self) -> u64 {
        self.size_batches.load(Ordering::Relaxed)
    }

    pub fn timeout_batches(&self) -> u64 {
        self.timeout_batches.load(Ordering::Relaxed)
    }

    /// Total swaps, whatever the trigger
    pub fn batches_dispatched(&self) -> u64 {
        self.size_batches() + self.timeout_batches()
    }

    pub fn processed_count(&self) -> u64 {
        self.processed_count.load(Ordering::Relaxed)
    }

    pub fn inc_processed_count(&self) {
        self.processed_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn failure_count(&self) -> u64 {
        self.failure_count.load(Ordering::Relaxed)
    }

    pub fn inc_failure_count(&self) {
        self.failure_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn dropped_count(&self) -> u64 {
        self.dropped_count.load(Ordering::Relaxed)
    }

    pub fn inc_dropped_count(&self) {
        self.dropped_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn stale_signals(&self) -> u64 {
        self.stale_signals.load(Ordering::Relaxed)
    }

    pub fn inc_stale_signals(&self) {
        self.stale_signals.fetch_add(1, Ordering::Relaxed);
    }

    pub fn discarded_items(&self) -> u64 {
        self.discarded_items.load(Ordering::Relaxed)
    }

    pub fn add_discarded_items(&self, count: u64) {
        self.discarded_items.fetch_add(count, Ordering::Relaxed);
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            queue_len: self.queue_len(),
            items_added: self.items_added(),
            size_batches: self.size_batches(),
            timeout_batches: self.timeout_batches(),
            processed_count: self.processed_count(),
            failure_count: self.failure_count(),
            dropped_count: self.dropped_count(),
            stale_signals: self.stale_signals(),
            discarded_items: self.discarded_items(),
        }
    }
}

/// Snapshot of dispatcher metrics (for reporting)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub queue_len: usize,
    pub items_added: u64,
    pub size_batches: u64,
    pub timeout_batches: u64,
    pub processed_count: u64,
    pub failure_count: u64,
    pub dropped_count: u64,
    pub stale_signals: u64,
    pub discarded_items: u64,
}

impl MetricsSnapshot {
    /// Total swaps, whatever the trigger
    pub fn batches_dispatched(&self) -> u64 {
        self.size_batches + self.timeout_batches
    }
}
