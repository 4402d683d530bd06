//! Serialized worker - owns the accumulator and runs the timeout monitor
//!
//! Every mutation of the accumulator happens on this one task, so the
//! accumulator needs no lock. Producers reach it through an unbounded command
//! channel; the timeout monitor shares the same `select!` loop.
//!
//! The monitor handles one signal at a time. While it waits out `wait` for a
//! generation, `add` commands keep being applied, but a newer signal is only
//! read after the current wait ends. Time-to-dispatch for a timeout batch is
//! therefore within `[wait, 2 * wait)`. A pending signal is read ahead of
//! queued commands, so a command backlog never delays arming the timer.

use std::sync::Arc;
use std::time::Duration;

use contracts::{Batch, Lsn};
use tokio::sync::mpsc;
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, trace, warn};

use crate::accumulator::{Accumulator, AddOutcome};
use crate::handoff::{HandoffQueue, Offer};
use crate::metrics::DispatcherMetrics;
use crate::signal::TimeoutSignal;

/// State moved into the serialized task
pub(crate) struct SerialWorker<T> {
    pub(crate) accumulator: Accumulator<T>,
    pub(crate) commands: mpsc::UnboundedReceiver<T>,
    pub(crate) signal: Arc<TimeoutSignal>,
    pub(crate) queue: Arc<HandoffQueue<T>>,
    pub(crate) metrics: Arc<DispatcherMetrics>,
    pub(crate) wait: Duration,
    pub(crate) scope: CancellationToken,
}

impl<T: Send + 'static> SerialWorker<T> {
    /// Run until the scope is cancelled or every producer handle is gone
    #[instrument(
        name = "dispatcher_serial_worker",
        skip(self),
        fields(wait_ms = self.wait.as_millis() as u64)
    )]
    pub(crate) async fn run(self) {
        let SerialWorker {
            mut accumulator,
            mut commands,
            signal,
            queue,
            metrics,
            wait,
            scope,
        } = self;

        debug!("Serialized worker started");

        let timer = sleep(wait);
        tokio::pin!(timer);
        // generation the monitor is currently waiting on
        let mut armed: Option<Lsn> = None;
        let mut monitor_open = true;

        loop {
            tokio::select! {
                biased;

                _ = scope.cancelled() => {
                    debug!("Dispatcher scope cancelled");
                    break;
                }

                () = &mut timer, if armed.is_some() => {
                    let Some(lsn) = armed.take() else { continue };
                    match accumulator.take_if_due(lsn) {
                        Some(batch) => publish(batch, &queue, &metrics),
                        None => {
                            metrics.inc_stale_signals();
                            observability::record_stale_signal();
                            trace!(lsn, "Timeout fired for a generation already dispatched");
                        }
                    }
                }

                lsn = signal.recv(), if armed.is_none() && monitor_open => {
                    match lsn {
                        Some(lsn) if accumulator.is_empty() => {
                            metrics.inc_stale_signals();
                            observability::record_stale_signal();
                            trace!(lsn, "Stale timeout signal ignored");
                        }
                        Some(lsn) => {
                            timer.as_mut().reset(Instant::now() + wait);
                            armed = Some(lsn);
                        }
                        None => {
                            debug!("Timeout signal closed, monitor stopped");
                            monitor_open = false;
                        }
                    }
                }

                item = commands.recv() => {
                    let Some(item) = item else {
                        debug!("All producer handles dropped, cancelling dispatcher scope");
                        scope.cancel();
                        break;
                    };

                    metrics.inc_items_added();
                    match accumulator.add(item) {
                        AddOutcome::Appended => {}
                        AddOutcome::Armed(lsn) => {
                            signal.send(lsn);
                        }
                        AddOutcome::Full(batch) => publish(batch, &queue, &metrics),
                    }
                }
            }
        }

        // Release: the open accumulator and anything still queued are abandoned.
        commands.close();
        let mut discarded = accumulator.discard() as u64;
        while commands.try_recv().is_ok() {
            discarded += 1;
        }
        if discarded > 0 {
            metrics.add_discarded_items(discarded);
            observability::record_items_discarded(discarded);
            debug!(discarded, "Unflushed items discarded at shutdown");
        }

        debug!("Serialized worker stopped");
    }
}

/// Hand a swapped-out batch to the consumer side
fn publish<T>(batch: Batch<T>, queue: &HandoffQueue<T>, metrics: &DispatcherMetrics) {
    let lsn = batch.lsn;
    let size = batch.len();
    let trigger = batch.trigger;

    metrics.inc_dispatched(trigger);
    observability::record_batch_dispatched(
        trigger.as_str(),
        size,
        batch.opened_at.elapsed().as_secs_f64() * 1000.0,
    );

    match queue.push(batch) {
        Offer::Accepted => {
            trace!(lsn, size, trigger = trigger.as_str(), "Batch handed off");
        }
        Offer::Evicted(old) => {
            metrics.inc_dropped_count();
            observability::record_batch_dropped(old.len());
            warn!(
                lsn,
                capacity = queue.capacity(),
                evicted_lsn = old.lsn,
                evicted_items = old.len(),
                "Hand-off queue full, oldest batch dropped"
            );
        }
        Offer::Closed(rejected) => {
            metrics.add_discarded_items(rejected.len() as u64);
            debug!(lsn, size, "Hand-off queue closed, batch discarded");
        }
    }

    let depth = queue.len();
    metrics.set_queue_len(depth);
    observability::record_queue_depth(depth);
}
