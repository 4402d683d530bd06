//! Dispatcher error types

use thiserror::Error;

/// Dispatcher-specific errors
#[derive(Debug, Error)]
pub enum DispatcherError {
    /// Processor creation error
    #[error("failed to create processor '{name}': {message}")]
    ProcessorCreation { name: String, message: String },

    /// Invalid batching configuration (from contract)
    #[error("invalid dispatcher config: {0}")]
    Contract(#[from] contracts::ContractError),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl DispatcherError {
    /// Create a processor creation error
    pub fn processor_creation(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ProcessorCreation {
            name: name.into(),
            message: message.into(),
        }
    }
}
