//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// dnsbatch - coalesce DNS transactions into batches for a downstream processor
#[derive(Parser, Debug)]
#[command(
    name = "dnsbatch",
    author,
    version,
    about = "DNS transaction batch dispatcher",
    long_about = "Coalesces DNS transactions from many producers into numbered batches.\n\n\
                  A batch is handed to the configured processor as soon as it is full, \n\
                  or after the configured wait, whichever comes first."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "DNSBATCH_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "DNSBATCH_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run mock producers feeding one dispatcher
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display configuration information
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(short, long, default_value = "dnsbatch.toml", env = "DNSBATCH_CONFIG")]
    pub config: PathBuf,

    /// Override batcher.batch_size from configuration
    #[arg(long, env = "DNSBATCH_BATCH_SIZE")]
    pub batch_size: Option<usize>,

    /// Override batcher.queue_capacity from configuration
    #[arg(long, env = "DNSBATCH_QUEUE_CAPACITY")]
    pub queue_capacity: Option<usize>,

    /// Override batcher.wait_ms from configuration
    #[arg(long, env = "DNSBATCH_WAIT_MS")]
    pub wait_ms: Option<u64>,

    /// Number of concurrent mock producers
    #[arg(long, default_value = "4", env = "DNSBATCH_PRODUCERS")]
    pub producers: usize,

    /// Transactions per second, per producer
    #[arg(long, default_value = "10", env = "DNSBATCH_RATE")]
    pub rate: f64,

    /// Run duration in seconds (0 = until Ctrl+C)
    #[arg(long, default_value = "0", env = "DNSBATCH_DURATION")]
    pub duration: u64,

    /// Validate configuration and exit without running
    #[arg(long)]
    pub dry_run: bool,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "DNSBATCH_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "dnsbatch.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "dnsbatch.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}
