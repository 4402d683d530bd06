//! Batch - Dispatcher output
//!
//! A finalized group of items handed from the accumulator to the consumer.

use std::time::Instant;

/// Generation number of an accumulator instance
pub type Lsn = u64;

/// What closed a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DispatchTrigger {
    /// The accumulator reached `batch_size`
    Size,
    /// The timeout monitor fired for this generation
    Timeout,
}

impl DispatchTrigger {
    /// Label used for logs and metrics
    pub fn as_str(&self) -> &'static str {
        match self {
            DispatchTrigger::Size => "size",
            DispatchTrigger::Timeout => "timeout",
        }
    }
}

/// Finalized batch
///
/// Items are kept in arrival order. Once swapped out of the accumulator a
/// batch is never mutated again.
#[derive(Debug, Clone)]
pub struct Batch<T> {
    /// Generation that produced this batch
    pub lsn: Lsn,

    /// Items in arrival order
    pub items: Vec<T>,

    /// Trigger that closed the batch
    pub trigger: DispatchTrigger,

    /// Arrival time of the first item
    pub opened_at: Instant,
}

impl<T> Batch<T> {
    /// Number of items
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the batch holds no items
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterate items in arrival order
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }
}

impl<'a, T> IntoIterator for &'a Batch<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
