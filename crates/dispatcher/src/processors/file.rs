//! FileProcessor - appends batch items to a JSON-lines file

use contracts::{Batch, BatchProcessor, ContractError, Lsn};
use serde::Serialize;
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, error, instrument};

/// Configuration for FileProcessor
#[derive(Debug, Clone)]
pub struct FileProcessorConfig {
    /// Output file, created (with parents) if missing
    pub path: PathBuf,
}

impl FileProcessorConfig {
    /// Create config from params map
    ///
    /// Returns `None` when `path` is missing.
    pub fn from_params(params: &HashMap<String, String>) -> Option<Self> {
        params.get("path").map(|path| Self {
            path: PathBuf::from(path),
        })
    }
}

/// One output line
#[derive(Serialize)]
struct Record<'a, T> {
    lsn: Lsn,
    item: &'a T,
}

/// Processor that writes every item as one JSON line
#[derive(Debug)]
pub struct FileProcessor {
    name: String,
    path: PathBuf,
    writer: BufWriter<File>,
    lines: u64,
}

impl FileProcessor {
    /// Create a new FileProcessor, opening the output file in append mode
    pub fn new(name: impl Into<String>, config: FileProcessorConfig) -> std::io::Result<Self> {
        if let Some(parent) = config.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&config.path)?;

        Ok(Self {
            name: name.into(),
            path: config.path,
            writer: BufWriter::new(file),
            lines: 0,
        })
    }

    /// Create from params map (for factory)
    pub fn from_params(
        name: impl Into<String>,
        params: &HashMap<String, String>,
    ) -> Result<Self, ContractError> {
        let name = name.into();
        let config = FileProcessorConfig::from_params(params).ok_or_else(|| {
            ContractError::processor_open(&name, "missing required parameter 'path'")
        })?;
        Self::new(name.clone(), config)
            .map_err(|e| ContractError::processor_open(name, e.to_string()))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Lines written so far
    pub fn lines(&self) -> u64 {
        self.lines
    }

    fn write_batch<T: Serialize>(&mut self, batch: &Batch<T>) -> std::io::Result<()> {
        for item in batch {
            let record = Record {
                lsn: batch.lsn,
                item,
            };
            serde_json::to_writer(&mut self.writer, &record)
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
            self.writer.write_all(b"\n")?;
            self.lines += 1;
        }
        self.writer.flush()
    }

    fn persist_batch<T: Serialize>(&mut self, batch: &Batch<T>) -> Result<(), ContractError> {
        self.write_batch(batch).map_err(|e| {
            error!(processor = %self.name, lsn = batch.lsn, error = %e, "Write failed");
            ContractError::process(&self.name, batch.lsn, e.to_string())
        })
    }
}

impl<T: Serialize + Sync> BatchProcessor<T> for FileProcessor {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "file_processor_process",
        skip(self, batch),
        fields(processor = %self.name, lsn = batch.lsn, size = batch.len())
    )]
    async fn process(&mut self, batch: &Batch<T>) -> Result<(), ContractError> {
        self.persist_batch(batch)
    }

    #[instrument(name = "file_processor_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        self.writer.flush()?;
        debug!(
            processor = %self.name,
            path = %self.path.display(),
            lines = self.lines,
            "FileProcessor closed"
        );
        Ok(())
    }
}
