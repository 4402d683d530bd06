//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 合约快照测试
//! - 配置 -> dispatcher -> processor 的 e2e 测试
//! - 多生产者并发与关闭语义

#[cfg(test)]
mod contract_tests {
    use contracts::{DispatcherBlueprint, DnsTransaction, QueryType, TransactionStatus};

    #[test]
    fn test_blueprint_snapshot() {
        let bp: DispatcherBlueprint = serde_json::from_str(
            r#"{ "processor": { "name": "log", "processor_type": "log" } }"#,
        )
        .unwrap();
        let json = serde_json::to_value(&bp).unwrap();

        assert_eq!(json["version"], "V1");
        assert_eq!(json["batcher"]["batch_size"], 20);
        assert_eq!(json["batcher"]["queue_capacity"], 2);
        assert_eq!(json["batcher"]["wait_ms"], 2500);
        assert_eq!(json["processor"]["processor_type"], "log");
    }

    #[test]
    fn test_transaction_snapshot() {
        let mut tx = DnsTransaction::new("a.example", 28, 10);
        tx.query_type = QueryType::DnsCrypt;
        let tx = tx.fail(TransactionStatus::TransportError, 30);
        let json = serde_json::to_value(&tx).unwrap();

        assert_eq!(json["name"], "a.example");
        assert_eq!(json["qtype"], 28);
        assert_eq!(json["status"], "transport_error");
        assert_eq!(json["query_type"], "dns_crypt");
        assert_eq!(json["response_time"], 30);
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::time::Duration;

    use config_loader::ConfigLoader;
    use contracts::{
        Batch, BatchProcessor, BatcherConfig, ContractError, DispatchTrigger, DnsTransaction,
    };
    use dispatcher::{create_dispatcher, BatchDispatcher, FnProcessor};
    use ingestion::{MockTransactionConfig, MockTransactionSource};
    use tokio::sync::{mpsc, Semaphore};
    use tokio_util::sync::CancellationToken;

    /// Poll `cond` until it holds or two seconds pass
    async fn wait_until(mut cond: impl FnMut() -> bool) {
        tokio::time::timeout(Duration::from_secs(2), async {
            while !cond() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("condition not reached in time");
    }

    /// End-to-end test: config file -> create_dispatcher -> FileProcessor
    ///
    /// 验证完整的数据流：
    /// 1. ConfigLoader 解析 TOML 配置
    /// 2. 两个满批次立即写出，剩余条目在超时后写出
    /// 3. 输出文件按 lsn 顺序包含全部条目
    #[tokio::test]
    async fn test_e2e_config_to_file_processor() {
        let dir = tempfile::tempdir().unwrap();
        let out_path = dir.path().join("out").join("transactions.jsonl");
        let config_path = dir.path().join("dnsbatch.toml");
        std::fs::write(
            &config_path,
            format!(
                r#"
[batcher]
batch_size = 10
queue_capacity = 4
wait_ms = 100

[processor]
name = "dns_file"
processor_type = "file"
[processor.params]
path = "{}"
"#,
                out_path.display().to_string().replace('\\', "/")
            ),
        )
        .unwrap();

        let blueprint = ConfigLoader::load_from_path(&config_path).unwrap();
        let scope = CancellationToken::new();
        let dispatcher: BatchDispatcher<DnsTransaction> =
            create_dispatcher(&scope, &blueprint).unwrap();

        for n in 0..25 {
            dispatcher.add(DnsTransaction::new(format!("host-{n}.example"), 1, n));
        }

        wait_until(|| dispatcher.snapshot().processed_count == 3).await;
        dispatcher.shutdown().await;

        let snapshot = dispatcher.snapshot();
        assert_eq!(snapshot.size_batches, 2);
        assert_eq!(snapshot.timeout_batches, 1);
        assert_eq!(snapshot.discarded_items, 0);

        let content = std::fs::read_to_string(&out_path).unwrap();
        let lines: Vec<serde_json::Value> = content
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 25);
        for (n, line) in lines.iter().enumerate() {
            assert_eq!(line["lsn"], (n / 10) as u64);
            assert_eq!(line["item"]["name"], format!("host-{n}.example"));
        }
    }

    /// Mock producers -> dispatcher: nothing lost, per-producer order kept
    #[tokio::test]
    async fn test_e2e_mock_sources_to_dispatcher() {
        let scope = CancellationToken::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let processor = FnProcessor::new("collect", move |batch: &Batch<DnsTransaction>| {
            let _ = tx.send((batch.lsn, batch.items.clone()));
            Ok(())
        });
        let config = BatcherConfig {
            batch_size: 7,
            queue_capacity: 64,
            wait_ms: 50,
        };
        let dispatcher = BatchDispatcher::spawn(&scope, processor, config).unwrap();

        let mut forwarders = Vec::new();
        for id in 0..3 {
            let source = MockTransactionSource::new(MockTransactionConfig {
                source_id: format!("producer-{id}"),
                domain: format!("p{id}.test"),
                frequency_hz: 1000.0,
                max_transactions: Some(20),
                ..Default::default()
            });
            let mut source_rx = source.start(16, None).unwrap();
            let dispatcher = dispatcher.clone();
            forwarders.push(tokio::spawn(async move {
                while let Some(transaction) = source_rx.recv().await {
                    dispatcher.add(transaction);
                }
            }));
        }
        for forwarder in forwarders {
            forwarder.await.unwrap();
        }

        let mut batches = Vec::new();
        let mut received = 0;
        while received < 60 {
            let (lsn, items) = tokio::time::timeout(Duration::from_secs(2), rx.recv())
                .await
                .expect("batch not delivered in time")
                .unwrap();
            received += items.len();
            batches.push((lsn, items));
        }
        dispatcher.shutdown().await;

        assert!(batches.windows(2).all(|w| w[0].0 + 1 == w[1].0));
        assert!(batches.iter().all(|(_, items)| items.len() <= 7));

        for id in 0..3 {
            let suffix = format!(".p{id}.test");
            let names: Vec<_> = batches
                .iter()
                .flat_map(|(_, items)| items.iter())
                .filter(|tx| tx.name.ends_with(&suffix))
                .map(|tx| tx.name.clone())
                .collect();
            let expected: Vec<_> = (0..20).map(|n| format!("host-{n}{suffix}")).collect();
            assert_eq!(names, expected);
        }
        assert_eq!(dispatcher.snapshot().dropped_count, 0);
    }

    /// Many concurrent producers: every item lands in exactly one batch
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_adds_exactly_once() {
        let scope = CancellationToken::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let processor = FnProcessor::new("collect", move |batch: &Batch<u64>| {
            let _ = tx.send(batch.clone());
            Ok(())
        });
        let config = BatcherConfig {
            batch_size: 20,
            queue_capacity: 64,
            wait_ms: 20,
        };
        let dispatcher = BatchDispatcher::spawn(&scope, processor, config).unwrap();

        let mut producers = Vec::new();
        for task in 0..8u64 {
            let dispatcher = dispatcher.clone();
            producers.push(tokio::spawn(async move {
                for i in 0..100 {
                    dispatcher.add(task * 1000 + i);
                    if i % 10 == 0 {
                        tokio::task::yield_now().await;
                    }
                }
            }));
        }
        for producer in producers {
            producer.await.unwrap();
        }

        let mut seen = HashSet::new();
        while seen.len() < 800 {
            let batch = tokio::time::timeout(Duration::from_secs(2), rx.recv())
                .await
                .expect("batch not delivered in time")
                .unwrap();
            match batch.trigger {
                DispatchTrigger::Size => assert_eq!(batch.len(), 20),
                DispatchTrigger::Timeout => assert!(batch.len() < 20),
            }
            for item in batch.items {
                assert!(seen.insert(item), "item {item} delivered twice");
            }
        }
        dispatcher.shutdown().await;

        let snapshot = dispatcher.snapshot();
        assert_eq!(snapshot.items_added, 800);
        assert_eq!(snapshot.dropped_count, 0);
        assert_eq!(snapshot.discarded_items, 0);
    }

    /// Processor that waits for a permit per batch
    struct GatedProcessor {
        gate: Arc<Semaphore>,
        seen: mpsc::UnboundedSender<u64>,
    }

    impl BatchProcessor<u32> for GatedProcessor {
        fn name(&self) -> &str {
            "gated"
        }

        async fn process(&mut self, batch: &Batch<u32>) -> Result<(), ContractError> {
            let permit = self
                .gate
                .acquire()
                .await
                .map_err(|e| ContractError::process("gated", batch.lsn, e.to_string()))?;
            permit.forget();
            let _ = self.seen.send(batch.lsn);
            Ok(())
        }

        async fn close(&mut self) -> Result<(), ContractError> {
            Ok(())
        }
    }

    /// Shutdown drains batches already handed off before tearing down
    #[tokio::test]
    async fn test_shutdown_drains_handed_off_batches() {
        let scope = CancellationToken::new();
        let gate = Arc::new(Semaphore::new(0));
        let (seen_tx, mut seen_rx) = mpsc::unbounded_channel();
        let processor = GatedProcessor {
            gate: Arc::clone(&gate),
            seen: seen_tx,
        };
        let config = BatcherConfig {
            batch_size: 1,
            queue_capacity: 4,
            wait_ms: 2500,
        };
        let dispatcher = BatchDispatcher::spawn(&scope, processor, config).unwrap();

        for i in 0..3 {
            dispatcher.add(i);
        }
        wait_until(|| dispatcher.snapshot().batches_dispatched() == 3).await;

        let shutdown = {
            let dispatcher = dispatcher.clone();
            tokio::spawn(async move { dispatcher.shutdown().await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!dispatcher.is_terminated());

        gate.add_permits(3);
        shutdown.await.unwrap();

        let mut lsns = Vec::new();
        while let Ok(lsn) = seen_rx.try_recv() {
            lsns.push(lsn);
        }
        assert_eq!(lsns, vec![0, 1, 2]);
        assert_eq!(dispatcher.snapshot().processed_count, 3);
    }

    /// Cancelling a parent scope stops every dispatcher spawned under it
    #[tokio::test]
    async fn test_parent_scope_stops_all_dispatchers() {
        let scope = CancellationToken::new();
        let dispatchers: Vec<BatchDispatcher<u32>> = (0..3)
            .map(|_| {
                let processor = FnProcessor::new("noop", |_: &Batch<u32>| Ok(()));
                BatchDispatcher::spawn(&scope, processor, BatcherConfig::default()).unwrap()
            })
            .collect();

        for dispatcher in &dispatchers {
            dispatcher.add(1);
        }
        scope.cancel();

        for dispatcher in &dispatchers {
            tokio::time::timeout(Duration::from_secs(1), dispatcher.shutdown())
                .await
                .expect("teardown should finish");
            assert!(dispatcher.is_terminated());
        }
    }
}
