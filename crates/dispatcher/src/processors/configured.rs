//! ConfiguredProcessor - processor selected by configuration

use contracts::{Batch, BatchProcessor, ContractError, ProcessorConfig, ProcessorType};
use serde::Serialize;
use tracing::{info, instrument};

use super::{FileProcessor, LogProcessor};
use crate::error::DispatcherError;

/// One of the built-in processors, chosen at runtime
#[derive(Debug)]
pub enum ConfiguredProcessor {
    Log(LogProcessor),
    File(FileProcessor),
}

impl ConfiguredProcessor {
    pub fn name(&self) -> &str {
        match self {
            Self::Log(p) => p.name(),
            Self::File(p) => p.name(),
        }
    }

    pub fn processor_type(&self) -> ProcessorType {
        match self {
            Self::Log(_) => ProcessorType::Log,
            Self::File(_) => ProcessorType::File,
        }
    }
}

impl<T: Serialize + Sync> BatchProcessor<T> for ConfiguredProcessor {
    fn name(&self) -> &str {
        ConfiguredProcessor::name(self)
    }

    async fn process(&mut self, batch: &Batch<T>) -> Result<(), ContractError> {
        match self {
            Self::Log(p) => BatchProcessor::<T>::process(p, batch).await,
            Self::File(p) => BatchProcessor::<T>::process(p, batch).await,
        }
    }

    async fn close(&mut self) -> Result<(), ContractError> {
        match self {
            Self::Log(p) => BatchProcessor::<T>::close(p).await,
            Self::File(p) => BatchProcessor::<T>::close(p).await,
        }
    }
}

/// Factory function to create a processor from config
#[instrument(
    name = "create_processor",
    skip(config),
    fields(processor = %config.name, processor_type = ?config.processor_type)
)]
pub fn create_processor(config: &ProcessorConfig) -> Result<ConfiguredProcessor, DispatcherError> {
    let processor = match config.processor_type {
        ProcessorType::Log => ConfiguredProcessor::Log(LogProcessor::new(&config.name)),
        ProcessorType::File => FileProcessor::from_params(&config.name, &config.params)
            .map(ConfiguredProcessor::File)
            .map_err(|e| DispatcherError::processor_creation(&config.name, e.to_string()))?,
    };

    info!(
        processor = %config.name,
        processor_type = ?config.processor_type,
        "Created processor"
    );
    Ok(processor)
}
