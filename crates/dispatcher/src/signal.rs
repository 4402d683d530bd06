//! Pending-timeout signal: a single-slot, latest-value-wins mailbox
//!
//! `send` never blocks and overwrites any value the monitor has not read yet.

use std::sync::{Mutex, MutexGuard, PoisonError};

use contracts::Lsn;
use tokio::sync::Notify;

#[derive(Debug, Default)]
struct Slot {
    pending: Option<Lsn>,
    closed: bool,
}

/// Conflated mailbox carrying the generation the timeout monitor should check
#[derive(Debug, Default)]
pub struct TimeoutSignal {
    slot: Mutex<Slot>,
    notify: Notify,
}

impl TimeoutSignal {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store `lsn`, replacing an unread value
    ///
    /// Returns false once the mailbox is closed.
    pub fn send(&self, lsn: Lsn) -> bool {
        {
            let mut slot = self.lock();
            if slot.closed {
                return false;
            }
            slot.pending = Some(lsn);
        }
        self.notify.notify_one();
        true
    }

    /// Stop accepting values; a waiting `recv` returns `None`
    pub fn close(&self) {
        {
            let mut slot = self.lock();
            slot.closed = true;
            slot.pending = None;
        }
        self.notify.notify_waiters();
        self.notify.notify_one();
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Wait for the next value; `None` after `close`
    ///
    /// Cancel safe: a value is only taken in the poll that returns it.
    pub async fn recv(&self) -> Option<Lsn> {
        loop {
            let notified = self.notify.notified();
            {
                let mut slot = self.lock();
                if slot.closed {
                    return None;
                }
                if let Some(lsn) = slot.pending.take() {
                    return Some(lsn);
                }
            }
            notified.await;
        }
    }
}
