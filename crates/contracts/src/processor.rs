//! BatchProcessor trait - Dispatcher output interface
//!
//! Defines the abstract interface for the downstream consumer.

use crate::{Batch, ContractError};

/// Batch consumer trait
///
/// The dispatcher invokes `process` sequentially from a single consumer task;
/// implementations never see overlapping calls.
#[trait_variant::make(BatchProcessor: Send)]
pub trait LocalBatchProcessor<T> {
    /// Processor name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Handle one finalized batch
    ///
    /// # Errors
    /// Returns processing error (should include context). The dispatcher logs
    /// it and moves on to the next batch.
    async fn process(&mut self, batch: &Batch<T>) -> Result<(), ContractError>;

    /// Release resources once the hand-off queue is drained
    async fn close(&mut self) -> Result<(), ContractError>;
}
