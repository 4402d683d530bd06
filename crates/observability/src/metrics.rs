//! 批次分发指标收集模块
//!
//! 通过 `metrics` facade 记录 Prometheus 指标，并提供进程内的批次统计聚合。

use contracts::DispatchTrigger;
use metrics::{counter, gauge, histogram};

/// 记录一次批次分发 (size 或 timeout 触发)
///
/// `latency_ms` 为批次从打开到关闭的时长。
pub fn record_batch_dispatched(trigger: &str, size: usize, latency_ms: f64) {
    counter!(
        "dnsbatch_batches_dispatched_total",
        "trigger" => trigger.to_string()
    )
    .increment(1);
    counter!("dnsbatch_items_dispatched_total").increment(size as u64);
    histogram!("dnsbatch_batch_size").record(size as f64);
    histogram!("dnsbatch_batch_latency_ms").record(latency_ms);
}

/// 记录交接队列溢出丢弃的批次
pub fn record_batch_dropped(items: usize) {
    counter!("dnsbatch_batches_dropped_total").increment(1);
    counter!("dnsbatch_items_dropped_total").increment(items as u64);
}

/// 记录处理器处理结果
pub fn record_batch_processed(processor: &str, success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!(
        "dnsbatch_batches_processed_total",
        "processor" => processor.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// 记录交接队列深度
pub fn record_queue_depth(depth: usize) {
    gauge!("dnsbatch_queue_depth").set(depth as f64);
}

/// 记录关闭时丢弃的条目
pub fn record_items_discarded(count: u64) {
    counter!("dnsbatch_items_discarded_total").increment(count);
}

/// 记录过期的超时信号
pub fn record_stale_signal() {
    counter!("dnsbatch_stale_signals_total").increment(1);
}

/// 批次统计聚合器
///
/// 在内存中聚合指标，便于统计和输出摘要。
#[derive(Debug, Clone, Default)]
pub struct BatchStatsAggregator {
    /// 总批次数
    pub total_batches: u64,

    /// 因达到 batch_size 关闭的批次
    pub size_batches: u64,

    /// 因超时关闭的批次
    pub timeout_batches: u64,

    /// 总条目数
    pub total_items: u64,

    /// 批次大小统计
    pub size_stats: RunningStats,

    /// 批次延迟统计 (毫秒)
    pub latency_stats: RunningStats,
}

impl BatchStatsAggregator {
    /// 创建新的聚合器
    pub fn new() -> Self {
        Self::default()
    }

    /// 更新聚合统计
    pub fn update(&mut self, trigger: DispatchTrigger, size: usize, latency_ms: f64) {
        self.total_batches += 1;
        self.total_items += size as u64;

        match trigger {
            DispatchTrigger::Size => self.size_batches += 1,
            DispatchTrigger::Timeout => self.timeout_batches += 1,
        }

        self.size_stats.push(size as f64);
        self.latency_stats.push(latency_ms);
    }

    /// 生成摘要报告
    pub fn summary(&self) -> BatchStatsSummary {
        BatchStatsSummary {
            total_batches: self.total_batches,
            size_batches: self.size_batches,
            timeout_batches: self.timeout_batches,
            total_items: self.total_items,
            timeout_rate: if self.total_batches > 0 {
                self.timeout_batches as f64 / self.total_batches as f64 * 100.0
            } else {
                0.0
            },
            batch_size: StatsSummary::from(&self.size_stats),
            latency_ms: StatsSummary::from(&self.latency_stats),
        }
    }

    /// 重置统计
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// 批次统计摘要
#[derive(Debug, Clone, Default)]
pub struct BatchStatsSummary {
    pub total_batches: u64,
    pub size_batches: u64,
    pub timeout_batches: u64,
    pub total_items: u64,
    pub timeout_rate: f64,
    pub batch_size: StatsSummary,
    pub latency_ms: StatsSummary,
}

impl std::fmt::Display for BatchStatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Batch Metrics Summary ===")?;
        writeln!(f, "Total batches: {}", self.total_batches)?;
        writeln!(f, "Total items: {}", self.total_items)?;
        writeln!(f, "Size-triggered: {}", self.size_batches)?;
        writeln!(
            f,
            "Timeout-triggered: {} ({:.2}%)",
            self.timeout_batches, self.timeout_rate
        )?;
        writeln!(f, "Batch size: {}", self.batch_size)?;
        writeln!(f, "Latency (ms): {}", self.latency_ms)?;
        Ok(())
    }
}

/// 统计摘要
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// 在线统计计算器 (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// 添加新值
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            self.m2 += delta * (value - self.mean);
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// 样本方差
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_running_stats() {
        let mut stats = RunningStats::default();
        for v in [1.0, 2.0, 3.0, 4.0, 5.0] {
            stats.push(v);
        }

        assert_eq!(stats.count(), 5);
        assert!((stats.mean() - 3.0).abs() < 1e-10);
        assert!((stats.min() - 1.0).abs() < 1e-10);
        assert!((stats.max() - 5.0).abs() < 1e-10);
        assert!((stats.variance() - 2.5).abs() < 1e-10);
    }

    #[test]
    fn test_aggregator_update() {
        let mut aggregator = BatchStatsAggregator::new();

        aggregator.update(DispatchTrigger::Size, 20, 120.0);
        aggregator.update(DispatchTrigger::Size, 20, 80.0);
        aggregator.update(DispatchTrigger::Timeout, 5, 2500.0);

        assert_eq!(aggregator.total_batches, 3);
        assert_eq!(aggregator.size_batches, 2);
        assert_eq!(aggregator.timeout_batches, 1);
        assert_eq!(aggregator.total_items, 45);

        let summary = aggregator.summary();
        assert!((summary.batch_size.mean - 15.0).abs() < 1e-10);
        assert!((summary.latency_ms.max - 2500.0).abs() < 1e-10);
        assert!((summary.timeout_rate - 100.0 / 3.0).abs() < 1e-10);

        aggregator.reset();
        assert_eq!(aggregator.total_batches, 0);
    }

    #[test]
    fn test_summary_display() {
        let summary = BatchStatsSummary {
            total_batches: 10,
            size_batches: 8,
            timeout_batches: 2,
            total_items: 170,
            timeout_rate: 20.0,
            batch_size: StatsSummary {
                count: 10,
                min: 5.0,
                max: 20.0,
                mean: 17.0,
                std_dev: 6.0,
            },
            latency_ms: StatsSummary::default(),
        };

        let output = format!("{}", summary);
        assert!(output.contains("Total batches: 10"));
        assert!(output.contains("20.00%"));
        assert!(output.contains("Latency (ms): N/A"));
    }
}
