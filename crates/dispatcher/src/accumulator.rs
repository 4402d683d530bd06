//! Accumulator - the single open batch and its generation counter
//!
//! Owned exclusively by the serialized worker; nothing here is shared.

use std::time::Instant;

use contracts::{Batch, DispatchTrigger, Lsn};

/// Upper bound on the up-front allocation for a new generation
const MAX_PREALLOC: usize = 1024;

/// What `add` did to the accumulator
#[derive(Debug)]
pub enum AddOutcome<T> {
    /// Item appended, nothing else to do
    Appended,
    /// First item of an empty accumulator; arm the timeout monitor for this generation
    Armed(Lsn),
    /// Size threshold reached; the returned batch was swapped out
    Full(Batch<T>),
}

/// In-progress batch plus its `lsn`
#[derive(Debug)]
pub struct Accumulator<T> {
    lsn: Lsn,
    items: Vec<T>,
    opened_at: Option<Instant>,
    batch_size: usize,
}

impl<T> Accumulator<T> {
    /// Create the generation-0 accumulator
    pub fn new(batch_size: usize) -> Self {
        let batch_size = batch_size.max(1);
        Self {
            lsn: 0,
            items: Vec::with_capacity(batch_size.min(MAX_PREALLOC)),
            opened_at: None,
            batch_size,
        }
    }

    /// Current generation
    pub fn lsn(&self) -> Lsn {
        self.lsn
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Append an item, swapping immediately when the batch is full
    pub fn add(&mut self, item: T) -> AddOutcome<T> {
        if self.items.is_empty() {
            self.opened_at = Some(Instant::now());
        }
        self.items.push(item);

        if self.items.len() >= self.batch_size {
            AddOutcome::Full(self.swap(DispatchTrigger::Size))
        } else if self.items.len() == 1 {
            AddOutcome::Armed(self.lsn)
        } else {
            AddOutcome::Appended
        }
    }

    /// Close the current generation and open `lsn + 1`
    pub fn swap(&mut self, trigger: DispatchTrigger) -> Batch<T> {
        let next = Vec::with_capacity(self.batch_size.min(MAX_PREALLOC));
        let items = std::mem::replace(&mut self.items, next);
        let batch = Batch {
            lsn: self.lsn,
            items,
            trigger,
            opened_at: self.opened_at.take().unwrap_or_else(Instant::now),
        };
        self.lsn += 1;
        batch
    }

    /// Timeout check: swap only if `lsn` is still open and holds items
    pub fn take_if_due(&mut self, lsn: Lsn) -> Option<Batch<T>> {
        if self.lsn == lsn && !self.items.is_empty() {
            Some(self.swap(DispatchTrigger::Timeout))
        } else {
            None
        }
    }

    /// Abandon the open batch, returning how many items were lost
    pub fn discard(self) -> usize {
        self.items.len()
    }
}
