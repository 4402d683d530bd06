//! DispatcherBlueprint - Config Loader output
//!
//! Describes the complete dispatcher setup: batching thresholds and the downstream processor.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use validator::Validate;

use crate::ContractError;

/// Configuration version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete dispatcher blueprint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatcherBlueprint {
    /// Configuration version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Batching thresholds
    #[serde(default)]
    pub batcher: BatcherConfig,

    /// Downstream processor
    pub processor: ProcessorConfig,
}

/// Batching thresholds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct BatcherConfig {
    /// Items per batch before an immediate (size-triggered) dispatch
    #[serde(default = "default_batch_size")]
    #[validate(range(min = 1, message = "batch_size must be >= 1"))]
    pub batch_size: usize,

    /// Maximum number of finalized batches buffered for the consumer
    #[serde(default = "default_queue_capacity")]
    #[validate(range(min = 1, message = "queue_capacity must be >= 1"))]
    pub queue_capacity: usize,

    /// Maximum delay (ms) before a time-triggered dispatch
    #[serde(default = "default_wait_ms")]
    #[validate(range(min = 1, message = "wait_ms must be >= 1"))]
    pub wait_ms: u64,
}

fn default_batch_size() -> usize {
    20
}

fn default_queue_capacity() -> usize {
    2
}

fn default_wait_ms() -> u64 {
    2500
}

impl Default for BatcherConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            queue_capacity: default_queue_capacity(),
            wait_ms: default_wait_ms(),
        }
    }
}

impl BatcherConfig {
    /// Timeout as a Duration
    pub fn wait(&self) -> Duration {
        Duration::from_millis(self.wait_ms)
    }

    /// Validate thresholds, reporting the first offending field
    pub fn check(&self) -> Result<(), ContractError> {
        let Err(errors) = self.validate() else {
            return Ok(());
        };

        let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
        fields.sort_by(|a, b| a.0.cmp(&b.0));

        match fields.first() {
            Some((field, errs)) => {
                let message = errs
                    .first()
                    .and_then(|e| e.message.as_ref().map(|m| m.to_string()))
                    .unwrap_or_else(|| "invalid value".to_string());
                Err(ContractError::config_validation(
                    format!("batcher.{field}"),
                    message,
                ))
            }
            None => Err(ContractError::config_validation("batcher", "invalid batcher config")),
        }
    }
}

/// Processor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessorConfig {
    /// Processor name
    pub name: String,

    /// Processor type
    pub processor_type: ProcessorType,

    /// Type-specific parameters
    #[serde(default)]
    pub params: HashMap<String, String>,
}

/// Processor type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessorType {
    /// Log a summary per batch
    Log,
    /// Append batches to a JSON-lines file
    File,
}
