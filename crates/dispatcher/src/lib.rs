//! # Dispatcher
//!
//! Batch-coalescing dispatcher.
//!
//! Responsibilities:
//! - Accumulate items from many producers into numbered batches
//! - Close a batch on size or after a wait, whichever comes first
//! - Hand batches to a single consumer through a bounded drop-oldest queue
//! - Isolate processor failures from the producer path

pub mod accumulator;
mod consumer;
pub mod dispatcher;
pub mod error;
pub mod handoff;
pub mod metrics;
pub mod processors;
pub mod signal;
mod worker;

pub use contracts::{Batch, BatchProcessor, BatcherConfig, DispatchTrigger, Lsn};
pub use dispatcher::{create_dispatcher, BatchDispatcher};
pub use error::DispatcherError;
pub use metrics::{DispatcherMetrics, MetricsSnapshot};
pub use processors::{
    create_processor, ConfiguredProcessor, FileProcessor, FnProcessor, LogProcessor,
};
