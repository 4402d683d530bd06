//! FnProcessor - adapts a closure into a BatchProcessor

use std::fmt;

use contracts::{Batch, BatchProcessor, ContractError};

/// Processor backed by a synchronous closure
///
/// Handy for tests and small integrations where a dedicated type would be
/// overkill. The closure runs on the consumer task, so it should not block
/// for long.
pub struct FnProcessor<F> {
    name: String,
    f: F,
}

impl<F> FnProcessor<F> {
    pub fn new<T>(name: impl Into<String>, f: F) -> Self
    where
        F: FnMut(&Batch<T>) -> Result<(), ContractError> + Send,
    {
        Self {
            name: name.into(),
            f,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl<F> fmt::Debug for FnProcessor<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnProcessor").field("name", &self.name).finish()
    }
}

impl<T, F> BatchProcessor<T> for FnProcessor<F>
where
    T: Sync,
    F: FnMut(&Batch<T>) -> Result<(), ContractError> + Send,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn process(&mut self, batch: &Batch<T>) -> Result<(), ContractError> {
        (self.f)(batch)
    }

    async fn close(&mut self) -> Result<(), ContractError> {
        Ok(())
    }
}
