//! BatchDispatcher - public handle plus the shutdown supervisor

use std::fmt;
use std::sync::Arc;

use contracts::{BatchProcessor, BatcherConfig, DispatcherBlueprint};
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, trace};

use crate::accumulator::Accumulator;
use crate::consumer::consume;
use crate::error::DispatcherError;
use crate::handoff::HandoffQueue;
use crate::metrics::{DispatcherMetrics, MetricsSnapshot};
use crate::processors::create_processor;
use crate::signal::TimeoutSignal;
use crate::worker::SerialWorker;

/// Handle to a running batch dispatcher
///
/// Cheap to clone; every clone feeds the same accumulator. The dispatcher
/// shuts down when `shutdown` is called, when the scope it was spawned under
/// is cancelled, or when the last handle is dropped.
pub struct BatchDispatcher<T> {
    commands: mpsc::UnboundedSender<T>,
    scope: CancellationToken,
    terminated: CancellationToken,
    metrics: Arc<DispatcherMetrics>,
    config: BatcherConfig,
}

impl<T> Clone for BatchDispatcher<T> {
    fn clone(&self) -> Self {
        Self {
            commands: self.commands.clone(),
            scope: self.scope.clone(),
            terminated: self.terminated.clone(),
            metrics: Arc::clone(&self.metrics),
            config: self.config,
        }
    }
}

impl<T> fmt::Debug for BatchDispatcher<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchDispatcher")
            .field("config", &self.config)
            .field("terminated", &self.is_terminated())
            .finish()
    }
}

impl<T: Send + Sync + 'static> BatchDispatcher<T> {
    /// Start the serialized worker, the consumer and the supervisor
    ///
    /// Runs under a child of `scope`: cancelling `scope` tears the dispatcher
    /// down, while `shutdown` leaves the parent untouched. Must be called from
    /// within a tokio runtime.
    ///
    /// # Errors
    /// Returns an error if any batching threshold is zero.
    #[instrument(
        name = "dispatcher_spawn",
        skip(scope, processor),
        fields(processor = %processor.name())
    )]
    pub fn spawn<P>(
        scope: &CancellationToken,
        processor: P,
        config: BatcherConfig,
    ) -> Result<Self, DispatcherError>
    where
        P: BatchProcessor<T> + 'static,
    {
        config.check()?;

        let scope = scope.child_token();
        let terminated = CancellationToken::new();
        let metrics = Arc::new(DispatcherMetrics::new());
        let signal = Arc::new(TimeoutSignal::new());
        let queue = Arc::new(HandoffQueue::new(config.queue_capacity));
        let (commands, commands_rx) = mpsc::unbounded_channel();

        let worker = SerialWorker {
            accumulator: Accumulator::new(config.batch_size),
            commands: commands_rx,
            signal: Arc::clone(&signal),
            queue: Arc::clone(&queue),
            metrics: Arc::clone(&metrics),
            wait: config.wait(),
            scope: scope.clone(),
        };
        let worker_handle = tokio::spawn(worker.run());

        let name = processor.name().to_string();
        let consumer_handle = tokio::spawn(consume(
            processor,
            Arc::clone(&queue),
            Arc::clone(&metrics),
            name,
        ));

        tokio::spawn(supervise(Teardown {
            scope: scope.clone(),
            signal,
            queue,
            worker: worker_handle,
            consumer: consumer_handle,
            terminated: terminated.clone(),
        }));

        info!(
            batch_size = config.batch_size,
            queue_capacity = config.queue_capacity,
            wait_ms = config.wait_ms,
            "Dispatcher started"
        );

        Ok(Self {
            commands,
            scope,
            terminated,
            metrics,
            config,
        })
    }

    /// Queue an item for the current batch
    ///
    /// Never blocks and never fails. After shutdown the item is discarded.
    pub fn add(&self, item: T) {
        if self.commands.send(item).is_err() {
            self.metrics.add_discarded_items(1);
            trace!("Dispatcher shut down, item discarded");
        }
    }
}

impl<T> BatchDispatcher<T> {
    /// Cancel the dispatcher and wait until teardown has finished
    ///
    /// Idempotent: later calls return once the first teardown is complete.
    /// Items still in the open accumulator are discarded, batches already
    /// handed off are drained into the processor.
    pub async fn shutdown(&self) {
        self.scope.cancel();
        self.terminated.cancelled().await;
    }

    /// Whether teardown has completed
    pub fn is_terminated(&self) -> bool {
        self.terminated.is_cancelled()
    }

    /// Shared metrics
    pub fn metrics(&self) -> &Arc<DispatcherMetrics> {
        &self.metrics
    }

    /// Current metrics values
    pub fn snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn config(&self) -> &BatcherConfig {
        &self.config
    }
}

/// Everything the supervisor tears down, in order
struct Teardown<T> {
    scope: CancellationToken,
    signal: Arc<TimeoutSignal>,
    queue: Arc<HandoffQueue<T>>,
    worker: JoinHandle<()>,
    consumer: JoinHandle<()>,
    terminated: CancellationToken,
}

/// Wait for cancellation, then tear down exactly once
///
/// Runs on its own task, outside the reach of the cancellation it reacts to.
#[instrument(name = "dispatcher_supervisor", skip(teardown))]
async fn supervise<T>(teardown: Teardown<T>) {
    teardown.scope.cancelled().await;
    debug!("Shutdown requested, tearing down dispatcher");

    // (a) stop the timeout monitor
    teardown.signal.close();

    // (b) stop hand-offs; the consumer drains what is buffered
    teardown.queue.close();

    // (c) release the serialized worker
    if let Err(e) = teardown.worker.await {
        error!(error = ?e, "Serialized worker panicked");
    }

    if let Err(e) = teardown.consumer.await {
        error!(error = ?e, "Consumer task panicked");
    }

    teardown.terminated.cancel();
    info!("Dispatcher shutdown complete");
}

/// Convenience function to build a dispatcher from a blueprint
///
/// The processor is created from `blueprint.processor`.
#[instrument(
    name = "dispatcher_create",
    skip(scope, blueprint),
    fields(processor = %blueprint.processor.name)
)]
pub fn create_dispatcher<T>(
    scope: &CancellationToken,
    blueprint: &DispatcherBlueprint,
) -> Result<BatchDispatcher<T>, DispatcherError>
where
    T: Serialize + Send + Sync + 'static,
{
    let processor = create_processor(&blueprint.processor)?;
    BatchDispatcher::spawn(scope, processor, blueprint.batcher)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processors::FnProcessor;
    use contracts::{Batch, ContractError, DispatchTrigger};
    use std::time::Duration;
    use tokio::time::{sleep, Instant};

    type Delivered = mpsc::UnboundedReceiver<(Batch<u32>, Instant)>;

    /// Dispatcher whose processor forwards every batch (with its arrival time) to the test
    fn channel_dispatcher(
        scope: &CancellationToken,
        config: BatcherConfig,
    ) -> (BatchDispatcher<u32>, Delivered) {
        let (tx, rx) = mpsc::unbounded_channel();
        let processor = FnProcessor::new("channel", move |batch: &Batch<u32>| {
            let _ = tx.send((batch.clone(), Instant::now()));
            Ok(())
        });
        let dispatcher = BatchDispatcher::spawn(scope, processor, config).unwrap();
        (dispatcher, rx)
    }

    #[tokio::test(start_paused = true)]
    async fn test_size_trigger_dispatches_immediately() {
        let scope = CancellationToken::new();
        let (dispatcher, mut rx) = channel_dispatcher(&scope, BatcherConfig::default());
        let start = Instant::now();

        for i in 0..20 {
            dispatcher.add(i);
        }

        let (batch, at) = rx.recv().await.unwrap();
        assert_eq!(batch.lsn, 0);
        assert_eq!(batch.items, (0..20).collect::<Vec<_>>());
        assert_eq!(batch.trigger, DispatchTrigger::Size);
        assert!(at.duration_since(start) < Duration::from_millis(2500));

        dispatcher.shutdown().await;
        assert_eq!(dispatcher.snapshot().size_batches, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_trigger_within_bounds() {
        let scope = CancellationToken::new();
        let (dispatcher, mut rx) = channel_dispatcher(&scope, BatcherConfig::default());
        let start = Instant::now();

        for i in 0..5 {
            dispatcher.add(i);
        }

        let (batch, at) = rx.recv().await.unwrap();
        let elapsed = at.duration_since(start);
        assert_eq!(batch.items, vec![0, 1, 2, 3, 4]);
        assert_eq!(batch.trigger, DispatchTrigger::Timeout);
        assert!(elapsed >= Duration::from_millis(2500), "{elapsed:?}");
        assert!(elapsed < Duration::from_millis(5000), "{elapsed:?}");

        dispatcher.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_size_trigger_preempts_pending_timeout() {
        let scope = CancellationToken::new();
        let (dispatcher, mut rx) = channel_dispatcher(&scope, BatcherConfig::default());

        dispatcher.add(0);
        sleep(Duration::from_millis(1000)).await;
        for i in 1..20 {
            dispatcher.add(i);
        }

        let (batch, _) = rx.recv().await.unwrap();
        assert_eq!(batch.len(), 20);
        assert_eq!(batch.trigger, DispatchTrigger::Size);

        // let the stale timeout fire; nothing else may be delivered
        sleep(Duration::from_millis(6000)).await;
        assert!(rx.try_recv().is_err());
        assert_eq!(dispatcher.snapshot().timeout_batches, 0);
        assert!(dispatcher.snapshot().stale_signals >= 1);

        dispatcher.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_signal_during_wait_waits_for_monitor() {
        let scope = CancellationToken::new();
        let config = BatcherConfig {
            batch_size: 2,
            ..Default::default()
        };
        let (dispatcher, mut rx) = channel_dispatcher(&scope, config);
        let start = Instant::now();

        // lsn 0 arms the monitor, then fills by size
        dispatcher.add(1);
        sleep(Duration::from_millis(100)).await;
        dispatcher.add(2);
        // lsn 1 opens while the monitor is still waiting on lsn 0
        sleep(Duration::from_millis(100)).await;
        dispatcher.add(3);

        let (first, _) = rx.recv().await.unwrap();
        assert_eq!(first.lsn, 0);
        assert_eq!(first.trigger, DispatchTrigger::Size);

        let (second, at) = rx.recv().await.unwrap();
        assert_eq!(second.lsn, 1);
        assert_eq!(second.items, vec![3]);
        assert_eq!(second.trigger, DispatchTrigger::Timeout);
        // monitor finished the lsn 0 wait at 2500ms, then waited again for lsn 1
        let elapsed = at.duration_since(start);
        assert!(elapsed >= Duration::from_millis(5000), "{elapsed:?}");

        dispatcher.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_monitor_arms_ahead_of_command_backlog() {
        let scope = CancellationToken::new();
        let config = BatcherConfig {
            batch_size: 3,
            ..Default::default()
        };
        let (dispatcher, mut rx) = channel_dispatcher(&scope, config);
        let start = Instant::now();

        // queued before the worker first runs: lsn 0 arms on item 0, fills on item 2
        for i in 0..4 {
            dispatcher.add(i);
        }

        let (first, _) = rx.recv().await.unwrap();
        assert_eq!(first.items, vec![0, 1, 2]);
        assert_eq!(first.trigger, DispatchTrigger::Size);

        // the monitor took lsn 0 before draining the backlog, so lsn 1 waits its turn
        let (second, at) = rx.recv().await.unwrap();
        assert_eq!(second.lsn, 1);
        assert_eq!(second.items, vec![3]);
        assert_eq!(second.trigger, DispatchTrigger::Timeout);
        let elapsed = at.duration_since(start);
        assert!(elapsed >= Duration::from_millis(5000), "{elapsed:?}");
        assert_eq!(dispatcher.snapshot().stale_signals, 1);

        dispatcher.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_discards_open_batch() {
        let scope = CancellationToken::new();
        let (dispatcher, mut rx) = channel_dispatcher(&scope, BatcherConfig::default());

        for i in 0..3 {
            dispatcher.add(i);
        }
        tokio::task::yield_now().await;

        dispatcher.shutdown().await;
        assert!(dispatcher.is_terminated());

        // second shutdown is a no-op
        dispatcher.shutdown().await;

        sleep(Duration::from_secs(10)).await;
        assert!(rx.try_recv().is_err());
        assert_eq!(dispatcher.snapshot().discarded_items, 3);
        assert_eq!(dispatcher.snapshot().batches_dispatched(), 0);

        // adds after shutdown are dropped silently
        dispatcher.add(42);
        assert_eq!(dispatcher.snapshot().discarded_items, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_parent_scope_cancellation_tears_down() {
        let scope = CancellationToken::new();
        let (dispatcher, _rx) = channel_dispatcher(&scope, BatcherConfig::default());

        scope.cancel();
        tokio::time::timeout(Duration::from_secs(1), dispatcher.shutdown())
            .await
            .expect("teardown should finish");
        assert!(dispatcher.is_terminated());
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_does_not_cancel_parent_scope() {
        let scope = CancellationToken::new();
        let (dispatcher, _rx) = channel_dispatcher(&scope, BatcherConfig::default());

        dispatcher.shutdown().await;
        assert!(!scope.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_all_handles_tears_down() {
        let scope = CancellationToken::new();
        let (dispatcher, _rx) = channel_dispatcher(&scope, BatcherConfig::default());
        let observer = dispatcher.terminated.clone();

        drop(dispatcher);
        tokio::time::timeout(Duration::from_secs(1), observer.cancelled())
            .await
            .expect("teardown should finish");
    }

    #[tokio::test(start_paused = true)]
    async fn test_overflow_keeps_latest_batches() {
        let scope = CancellationToken::new();
        let config = BatcherConfig {
            batch_size: 2,
            queue_capacity: 2,
            wait_ms: 2500,
        };
        let (tx, mut rx) = mpsc::unbounded_channel();
        let processor = FnProcessor::new("slow", move |batch: &Batch<u32>| {
            let _ = tx.send(batch.lsn);
            // block the consumer long enough for the queue to overflow
            std::thread::sleep(std::time::Duration::from_millis(5));
            Ok(())
        });
        let dispatcher = BatchDispatcher::spawn(&scope, processor, config).unwrap();

        for i in 0..20 {
            dispatcher.add(i);
        }
        while dispatcher.snapshot().batches_dispatched() < 10 {
            tokio::task::yield_now().await;
        }
        dispatcher.shutdown().await;

        let mut delivered = Vec::new();
        while let Ok(lsn) = rx.try_recv() {
            delivered.push(lsn);
        }

        assert!(delivered.windows(2).all(|w| w[0] < w[1]), "{delivered:?}");
        assert_eq!(delivered.last(), Some(&9));
        let snapshot = dispatcher.snapshot();
        assert_eq!(snapshot.batches_dispatched(), 10);
        assert_eq!(
            delivered.len() as u64 + snapshot.dropped_count,
            snapshot.batches_dispatched()
        );
    }

    #[tokio::test]
    async fn test_processor_failure_isolated() {
        let scope = CancellationToken::new();
        let config = BatcherConfig {
            batch_size: 1,
            queue_capacity: 16,
            wait_ms: 2500,
        };
        let (tx, mut rx) = mpsc::unbounded_channel();
        let processor = FnProcessor::new("flaky", move |batch: &Batch<u32>| match batch.lsn {
            0 => Err(ContractError::process("flaky", batch.lsn, "boom")),
            1 => panic!("processor exploded"),
            _ => {
                let _ = tx.send(batch.lsn);
                Ok(())
            }
        });
        let dispatcher = BatchDispatcher::spawn(&scope, processor, config).unwrap();

        for i in 0..4 {
            dispatcher.add(i);
        }

        assert_eq!(rx.recv().await, Some(2));
        assert_eq!(rx.recv().await, Some(3));

        dispatcher.shutdown().await;
        let snapshot = dispatcher.snapshot();
        assert_eq!(snapshot.failure_count, 2);
        assert_eq!(snapshot.processed_count, 2);
    }

    #[tokio::test]
    async fn test_spawn_rejects_zero_batch_size() {
        let scope = CancellationToken::new();
        let processor = FnProcessor::new("noop", |_: &Batch<u32>| Ok(()));
        let config = BatcherConfig {
            batch_size: 0,
            ..Default::default()
        };

        let err = BatchDispatcher::spawn(&scope, processor, config).unwrap_err();
        assert!(matches!(err, DispatcherError::Contract(_)));
    }
}
