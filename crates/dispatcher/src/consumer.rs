//! Consumer loop - drains the hand-off queue into the processor
//!
//! Runs on its own task so a slow processor never stalls producers. Batches
//! are processed one at a time in queue order; a failing or panicking batch
//! is logged and skipped.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use contracts::BatchProcessor;
use futures::FutureExt;
use tracing::{debug, error, instrument, trace};

use crate::handoff::HandoffQueue;
use crate::metrics::DispatcherMetrics;

/// Worker task that consumes batches and hands them to the processor
#[instrument(
    name = "dispatcher_consumer_loop",
    skip(processor, queue, metrics),
    fields(processor = %name)
)]
pub(crate) async fn consume<T, P>(
    mut processor: P,
    queue: Arc<HandoffQueue<T>>,
    metrics: Arc<DispatcherMetrics>,
    name: String,
) where
    T: Send + Sync + 'static,
    P: BatchProcessor<T> + 'static,
{
    debug!(processor = %name, "Consumer loop started");

    while let Some(batch) = queue.pop().await {
        let depth = queue.len();
        metrics.set_queue_len(depth);
        observability::record_queue_depth(depth);

        let outcome = AssertUnwindSafe(processor.process(&batch))
            .catch_unwind()
            .await;

        match outcome {
            Ok(Ok(())) => {
                metrics.inc_processed_count();
                observability::record_batch_processed(&name, true);
                trace!(lsn = batch.lsn, size = batch.len(), "Batch processed");
            }
            Ok(Err(e)) => {
                metrics.inc_failure_count();
                observability::record_batch_processed(&name, false);
                error!(
                    processor = %name,
                    lsn = batch.lsn,
                    size = batch.len(),
                    error = %e,
                    "Processor failed"
                );
                // Continue processing - don't stop on single failure
            }
            Err(panic) => {
                metrics.inc_failure_count();
                observability::record_batch_processed(&name, false);
                error!(
                    processor = %name,
                    lsn = batch.lsn,
                    size = batch.len(),
                    panic = %panic_message(panic.as_ref()),
                    "Processor panicked"
                );
            }
        }
    }

    // Cleanup
    if let Err(e) = processor.close().await {
        error!(processor = %name, error = %e, "Close failed on shutdown");
    }

    debug!(processor = %name, "Consumer loop stopped");
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
