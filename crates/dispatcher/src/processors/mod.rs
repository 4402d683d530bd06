//! Built-in batch processors
//!
//! Contains LogProcessor, FileProcessor, FnProcessor and the
//! configuration-driven ConfiguredProcessor.

mod configured;
mod file;
mod func;
mod log;

pub use self::configured::{create_processor, ConfiguredProcessor};
pub use self::file::{FileProcessor, FileProcessorConfig};
pub use self::func::FnProcessor;
pub use self::log::LogProcessor;
