//! Ingestion 错误类型

use thiserror::Error;

/// Ingestion 错误
#[derive(Debug, Error)]
pub enum IngestionError {
    /// 生成频率非法
    #[error("invalid rate for source {source_id}: {frequency_hz} Hz")]
    InvalidRate {
        /// 数据源 ID
        source_id: String,
        /// 配置的频率
        frequency_hz: f64,
    },

    /// 数据源已在运行
    #[error("source {source_id} is already running")]
    AlreadyRunning {
        /// 数据源 ID
        source_id: String,
    },
}

/// Ingestion Result 类型别名
pub type Result<T> = std::result::Result<T, IngestionError>;
