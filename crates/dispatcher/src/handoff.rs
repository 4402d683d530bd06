//! Hand-off queue between the serialized worker and the consumer.
//!
//! Fixed-capacity ring buffer with drop-oldest overflow: pushing into a full
//! queue evicts the oldest buffered batch instead of blocking or rejecting.
//! After `close` the consumer still drains whatever is buffered.

use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use contracts::Batch;
use ringbuf::{traits::*, HeapRb};
use tokio::sync::Notify;

/// Result of offering a batch to the queue
#[derive(Debug)]
pub enum Offer<T> {
    /// Buffered without loss
    Accepted,
    /// Buffered; the returned (oldest) batch was evicted to make room
    Evicted(Batch<T>),
    /// Queue closed; the batch was not buffered
    Closed(Batch<T>),
}

struct Inner<T> {
    ring: HeapRb<Batch<T>>,
    closed: bool,
}

/// Bounded, lossy, FIFO queue of finalized batches
pub struct HandoffQueue<T> {
    inner: Mutex<Inner<T>>,
    notify: Notify,
    capacity: usize,
}

impl<T> fmt::Debug for HandoffQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandoffQueue")
            .field("len", &self.len())
            .field("capacity", &self.capacity)
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl<T> HandoffQueue<T> {
    /// Create a queue holding at most `capacity` batches
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            inner: Mutex::new(Inner {
                ring: HeapRb::new(capacity),
                closed: false,
            }),
            notify: Notify::new(),
            capacity,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner<T>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.lock().ring.occupied_len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Enqueue without blocking, evicting the oldest batch when full
    pub fn push(&self, batch: Batch<T>) -> Offer<T> {
        let offer = {
            let mut inner = self.lock();
            if inner.closed {
                return Offer::Closed(batch);
            }
            match inner.ring.push_overwrite(batch) {
                Some(evicted) => Offer::Evicted(evicted),
                None => Offer::Accepted,
            }
        };
        self.notify.notify_one();
        offer
    }

    /// Stop accepting batches; buffered ones stay available to `pop`
    pub fn close(&self) {
        self.lock().closed = true;
        self.notify.notify_waiters();
        self.notify.notify_one();
    }

    /// Dequeue the oldest batch, waiting while the queue is empty and open
    ///
    /// Returns `None` once the queue is closed and fully drained.
    pub async fn pop(&self) -> Option<Batch<T>> {
        loop {
            let notified = self.notify.notified();
            {
                let mut inner = self.lock();
                if let Some(batch) = inner.ring.try_pop() {
                    return Some(batch);
                }
                if inner.closed {
                    return None;
                }
            }
            notified.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::DispatchTrigger;
    use std::sync::Arc;
    use std::time::Instant;

    fn batch(lsn: u64) -> Batch<u64> {
        Batch {
            lsn,
            items: vec![lsn],
            trigger: DispatchTrigger::Size,
            opened_at: Instant::now(),
        }
    }

    #[tokio::test]
    async fn test_fifo_order() {
        let queue = HandoffQueue::new(4);
        for lsn in 0..3 {
            assert!(matches!(queue.push(batch(lsn)), Offer::Accepted));
        }
        assert_eq!(queue.len(), 3);

        for lsn in 0..3 {
            assert_eq!(queue.pop().await.unwrap().lsn, lsn);
        }
        assert!(queue.is_empty());
    }

    #[test]
    fn test_capacity_clamped_to_one() {
        let queue = HandoffQueue::new(0);
        assert_eq!(queue.capacity(), 1);

        queue.push(batch(0));
        match queue.push(batch(1)) {
            Offer::Evicted(old) => assert_eq!(old.lsn, 0),
            other => panic!("expected eviction, got {other:?}"),
        }
        assert_eq!(queue.len(), queue.capacity());
    }

    #[tokio::test]
    async fn test_overflow_drops_oldest() {
        let queue = HandoffQueue::new(2);
        queue.push(batch(0));
        queue.push(batch(1));

        match queue.push(batch(2)) {
            Offer::Evicted(old) => assert_eq!(old.lsn, 0),
            other => panic!("expected eviction, got {other:?}"),
        }
        match queue.push(batch(3)) {
            Offer::Evicted(old) => assert_eq!(old.lsn, 1),
            other => panic!("expected eviction, got {other:?}"),
        }

        assert_eq!(queue.len(), 2);
        assert_eq!(queue.pop().await.unwrap().lsn, 2);
        assert_eq!(queue.pop().await.unwrap().lsn, 3);
    }

    #[tokio::test]
    async fn test_close_drains_then_ends() {
        let queue = HandoffQueue::new(2);
        queue.push(batch(5));
        queue.close();

        assert!(matches!(queue.push(batch(6)), Offer::Closed(b) if b.lsn == 6));
        assert_eq!(queue.pop().await.unwrap().lsn, 5);
        assert!(queue.pop().await.is_none());
    }

    #[tokio::test]
    async fn test_pop_waits_for_push() {
        let queue = Arc::new(HandoffQueue::new(2));
        let consumer = {
            let queue = Arc::clone(&queue);
            tokio::spawn(async move { queue.pop().await.map(|b| b.lsn) })
        };

        tokio::task::yield_now().await;
        queue.push(batch(9));

        assert_eq!(consumer.await.unwrap(), Some(9));
    }

    #[tokio::test]
    async fn test_close_wakes_waiting_consumer() {
        let queue: Arc<HandoffQueue<u64>> = Arc::new(HandoffQueue::new(2));
        let consumer = {
            let queue = Arc::clone(&queue);
            tokio::spawn(async move { queue.pop().await.is_none() })
        };

        tokio::task::yield_now().await;
        queue.close();

        assert!(consumer.await.unwrap());
    }
}
