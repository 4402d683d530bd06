//! Layered error definitions
//!
//! Categorized by source: config / processor / general

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Processor Errors =====
    /// Processor failed on a batch
    #[error("processor '{processor}' failed on batch {lsn}: {message}")]
    Process {
        processor: String,
        lsn: u64,
        message: String,
    },

    /// Processor could not be opened
    #[error("processor '{processor}' open error: {message}")]
    ProcessorOpen { processor: String, message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create batch processing error
    pub fn process(processor: impl Into<String>, lsn: u64, message: impl Into<String>) -> Self {
        Self::Process {
            processor: processor.into(),
            lsn,
            message: message.into(),
        }
    }

    /// Create processor open error
    pub fn processor_open(processor: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ProcessorOpen {
            processor: processor.into(),
            message: message.into(),
        }
    }
}
