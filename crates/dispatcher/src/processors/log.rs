//! LogProcessor - logs batch summaries via tracing

use contracts::{Batch, BatchProcessor, ContractError};
use tracing::{info, instrument};

/// Processor that logs one summary line per batch
#[derive(Debug, Clone)]
pub struct LogProcessor {
    name: String,
    batches: u64,
}

impl LogProcessor {
    /// Create a new LogProcessor with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            batches: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Batches logged so far
    pub fn batches(&self) -> u64 {
        self.batches
    }

    fn log_batch_summary<T>(&mut self, batch: &Batch<T>) {
        self.batches += 1;
        info!(
            processor = %self.name,
            lsn = batch.lsn,
            size = batch.len(),
            trigger = batch.trigger.as_str(),
            age_ms = batch.opened_at.elapsed().as_millis() as u64,
            "Batch received"
        );
    }
}

impl<T: Sync> BatchProcessor<T> for LogProcessor {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "log_processor_process",
        skip(self, batch),
        fields(processor = %self.name, lsn = batch.lsn)
    )]
    async fn process(&mut self, batch: &Batch<T>) -> Result<(), ContractError> {
        self.log_batch_summary(batch);
        Ok(())
    }

    #[instrument(name = "log_processor_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        info!(processor = %self.name, batches = self.batches, "LogProcessor closed");
        Ok(())
    }
}
