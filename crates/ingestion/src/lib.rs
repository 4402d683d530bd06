//! # Ingestion
//!
//! DNS transaction producers.
//!
//! Responsibilities:
//! - Generate `DnsTransaction` records at a configured rate (mock resolver)
//! - Stream them to the caller through a tokio mpsc channel
//! - Count produced and undeliverable records
//!
//! ## Mock Testing
//!
//! ```ignore
//! use ingestion::MockTransactionSource;
//!
//! let source = MockTransactionSource::with_rate("producer-0", 50.0);
//! let mut rx = source.start(100, None)?;
//! while let Some(tx) = rx.recv().await {
//!     dispatcher.add(tx);
//! }
//! ```

mod config;
mod error;
mod mock;

// Re-exports
pub use config::{IngestionMetrics, MetricsSnapshot};
pub use contracts::DnsTransaction;
pub use error::{IngestionError, Result};
pub use mock::{MockTransactionConfig, MockTransactionSource};
