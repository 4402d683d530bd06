//! # Contracts
//!
//! Frozen interface contracts shared by every crate in the workspace.
//! Business crates depend on this crate only; reverse dependencies are prohibited.
//!
//! ## Generation model
//! - Every batch carries an `lsn` (generation number) assigned by the accumulator
//! - `lsn` grows by exactly one per swap and is never reused

mod batch;
mod blueprint;
mod error;
mod processor;
mod transaction;

pub use batch::*;
pub use blueprint::*;
pub use error::*;
pub use processor::BatchProcessor;
pub use transaction::*;
