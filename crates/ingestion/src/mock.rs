//! Mock 事务源
//!
//! 无真实解析器时生成模拟的 DNS 事务，用于 CLI 演示和测试。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use chrono::Utc;
use contracts::{DnsTransaction, QueryType, TransactionStatus};
use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::config::IngestionMetrics;
use crate::error::{IngestionError, Result};

/// A, AAAA, HTTPS, CNAME
const QTYPES: [u16; 4] = [1, 28, 65, 5];

const TRANSPORTS: [QueryType; 3] = [QueryType::Doh, QueryType::DnsCrypt, QueryType::DnsProxy];

const FAILURES: [TransactionStatus; 4] = [
    TransactionStatus::NoResponse,
    TransactionStatus::TransportError,
    TransactionStatus::BadResponse,
    TransactionStatus::SendFail,
];

/// Mock 事务源配置
#[derive(Debug, Clone)]
pub struct MockTransactionConfig {
    /// 数据源 ID (用于日志和指标)
    pub source_id: String,

    /// 查询域名后缀，生成 `host-{n}.{domain}`
    pub domain: String,

    /// 发送频率 (Hz)
    pub frequency_hz: f64,

    /// 每 N 个事务失败一次 (0 = 从不)
    pub failure_every: u64,

    /// 每 N 个事务命中一次 blocklist (0 = 从不)
    pub block_every: u64,

    /// 生成数量上限 (None = 不限)
    pub max_transactions: Option<u64>,
}

impl Default for MockTransactionConfig {
    fn default() -> Self {
        Self {
            source_id: "mock_source".to_string(),
            domain: "example.com".to_string(),
            frequency_hz: 10.0,
            failure_every: 10,
            block_every: 7,
            max_transactions: None,
        }
    }
}

/// Mock 事务源
pub struct MockTransactionSource {
    config: MockTransactionConfig,
    running: Arc<AtomicBool>,
}

impl MockTransactionSource {
    pub fn new(config: MockTransactionConfig) -> Self {
        Self {
            config,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// 以默认配置和指定频率创建
    pub fn with_rate(source_id: &str, frequency_hz: f64) -> Self {
        Self::new(MockTransactionConfig {
            source_id: source_id.to_string(),
            frequency_hz,
            ..Default::default()
        })
    }

    pub fn config(&self) -> &MockTransactionConfig {
        &self.config
    }

    /// 启动数据源，返回事务流接收端
    ///
    /// # Arguments
    /// * `channel_capacity` - 通道容量
    /// * `metrics` - 可选的 metrics 实例
    ///
    /// # Errors
    /// 频率非正数或非有限值，或数据源已在运行。
    pub fn start(
        &self,
        channel_capacity: usize,
        metrics: Option<Arc<IngestionMetrics>>,
    ) -> Result<mpsc::Receiver<DnsTransaction>> {
        let config = self.config.clone();
        if !(config.frequency_hz.is_finite() && config.frequency_hz > 0.0) {
            return Err(IngestionError::InvalidRate {
                source_id: config.source_id,
                frequency_hz: config.frequency_hz,
            });
        }
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(IngestionError::AlreadyRunning {
                source_id: config.source_id,
            });
        }

        let (tx, rx) = mpsc::channel(channel_capacity.max(1));
        let running = self.running.clone();
        let metrics = metrics.unwrap_or_else(|| Arc::new(IngestionMetrics::new()));

        tokio::spawn(async move {
            let interval = Duration::from_secs_f64(1.0 / config.frequency_hz);
            let mut seq: u64 = 0;

            debug!(
                source_id = %config.source_id,
                frequency_hz = config.frequency_hz,
                "mock transaction source started"
            );

            while running.load(Ordering::Relaxed) {
                if config.max_transactions.is_some_and(|max| seq >= max) {
                    debug!(source_id = %config.source_id, seq, "transaction limit reached");
                    break;
                }

                let now_ms = Utc::now().timestamp_millis().max(0) as u64;
                let transaction = generate(&config, seq, now_ms);
                metrics.record_produced(&config.source_id, transaction.status.is_success());

                if tx.send(transaction).await.is_err() {
                    metrics.record_send_failure();
                    debug!(source_id = %config.source_id, "mock transaction channel closed");
                    break;
                }

                trace!(source_id = %config.source_id, seq, "mock transaction sent");
                seq += 1;

                tokio::time::sleep(interval).await;
            }

            running.store(false, Ordering::SeqCst);
            debug!(source_id = %config.source_id, produced = seq, "mock transaction source stopped");
        });

        Ok(rx)
    }

    /// 停止数据源
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }
}

/// 生成第 `seq` 个事务
fn generate(config: &MockTransactionConfig, seq: u64, now_ms: u64) -> DnsTransaction {
    let name = format!("host-{seq}.{}", config.domain);
    let qtype = QTYPES[(seq % QTYPES.len() as u64) as usize];
    let latency_ms = 5 + seq % 40;

    let mut transaction = DnsTransaction::new(name, qtype, now_ms);
    transaction.query_type = TRANSPORTS[(seq % TRANSPORTS.len() as u64) as usize];
    transaction.server_ip = Some(format!("10.0.0.{}", seq % 254 + 1));
    if transaction.query_type.is_dns_crypt() {
        transaction.relay_ip = Some("10.1.0.1".to_string());
    }

    if is_nth(seq, config.block_every) {
        transaction.blocklist = Some("ads".to_string());
    }

    if is_nth(seq, config.failure_every) {
        let status = FAILURES[((seq / config.failure_every) % FAILURES.len() as u64) as usize];
        transaction.fail(status, now_ms + latency_ms)
    } else {
        let response = Bytes::from(format!("answer:{}", transaction.name).into_bytes());
        transaction.complete(response, now_ms + latency_ms)
    }
}

fn is_nth(seq: u64, every: u64) -> bool {
    every > 0 && seq % every == every - 1
}
