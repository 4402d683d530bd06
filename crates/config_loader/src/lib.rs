//! # Config Loader
//!
//! Configuration loading and parsing module.
//!
//! Responsibilities:
//! - Parse TOML/JSON configuration files
//! - Validate configuration legality
//! - Generate `DispatcherBlueprint`
//!
//! # Example
//!
//! ```no_run
//! use config_loader::ConfigLoader;
//! use std::path::Path;
//!
//! let blueprint = ConfigLoader::load_from_path(Path::new("config.toml")).unwrap();
//! println!("Batch size: {}", blueprint.batcher.batch_size);
//! ```

mod parser;
mod validator;

pub use contracts::DispatcherBlueprint;
pub use parser::ConfigFormat;

use contracts::{BatcherConfig, ContractError};
use std::path::Path;

/// Batching thresholds supplied outside the config file (CLI flags, env)
///
/// `None` keeps the value from the file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatcherOverrides {
    pub batch_size: Option<usize>,
    pub queue_capacity: Option<usize>,
    pub wait_ms: Option<u64>,
}

impl BatcherOverrides {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Overwrite the fields that are set
    pub fn apply(&self, batcher: &mut BatcherConfig) {
        if let Some(batch_size) = self.batch_size {
            batcher.batch_size = batch_size;
        }
        if let Some(queue_capacity) = self.queue_capacity {
            batcher.queue_capacity = queue_capacity;
        }
        if let Some(wait_ms) = self.wait_ms {
            batcher.wait_ms = wait_ms;
        }
    }
}

/// Configuration loader
///
/// Provides static methods to load configuration from files or strings.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from file path
    ///
    /// Automatically detects format from file extension (.toml / .json).
    ///
    /// # Errors
    /// - File read failure
    /// - Unsupported format
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_path(path: &Path) -> Result<DispatcherBlueprint, ContractError> {
        let format = Self::detect_format(path)?;
        let content = Self::read_file(path)?;
        Self::load_from_str(&content, format)
    }

    /// Load configuration from file path, then apply overrides
    ///
    /// The merged blueprint is validated again, so an override of zero is
    /// rejected the same way a zero in the file is.
    pub fn load_with_overrides(
        path: &Path,
        overrides: &BatcherOverrides,
    ) -> Result<DispatcherBlueprint, ContractError> {
        let mut blueprint = Self::load_from_path(path)?;
        if !overrides.is_empty() {
            overrides.apply(&mut blueprint.batcher);
            validator::validate(&blueprint)?;
        }
        Ok(blueprint)
    }

    /// Load configuration from string
    ///
    /// # Errors
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_str(
        content: &str,
        format: ConfigFormat,
    ) -> Result<DispatcherBlueprint, ContractError> {
        Self::parse_and_validate(content, format)
    }

    /// Serialize DispatcherBlueprint to TOML string
    pub fn to_toml(blueprint: &DispatcherBlueprint) -> Result<String, ContractError> {
        toml::to_string_pretty(blueprint)
            .map_err(|e| ContractError::config_parse(format!("TOML serialize error: {e}")))
    }

    /// Serialize DispatcherBlueprint to JSON string
    pub fn to_json(blueprint: &DispatcherBlueprint) -> Result<String, ContractError> {
        serde_json::to_string_pretty(blueprint)
            .map_err(|e| ContractError::config_parse(format!("JSON serialize error: {e}")))
    }
}

impl ConfigLoader {
    /// Infer configuration format from file extension
    fn detect_format(path: &Path) -> Result<ConfigFormat, ContractError> {
        let ext = path.extension().and_then(|e| e.to_str()).ok_or_else(|| {
            ContractError::config_parse("cannot determine file format from extension")
        })?;

        ConfigFormat::from_extension(ext).ok_or_else(|| {
            ContractError::config_parse(format!("unsupported config format: .{ext}"))
        })
    }

    /// Read configuration file content
    fn read_file(path: &Path) -> Result<String, ContractError> {
        Ok(std::fs::read_to_string(path)?)
    }

    /// Parse and validate configuration content
    fn parse_and_validate(
        content: &str,
        format: ConfigFormat,
    ) -> Result<DispatcherBlueprint, ContractError> {
        let blueprint = parser::parse(content, format)?;
        validator::validate(&blueprint)?;
        Ok(blueprint)
    }
}
