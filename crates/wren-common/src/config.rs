//! Configuration for WrenDB.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::constants::{DEFAULT_BLOCK_SIZE, MAX_BLOCK_SIZE, MIN_BLOCK_SIZE};

/// Database configuration.
///
/// # Example
///
/// ```rust
/// use wren_common::config::DatabaseConfig;
///
/// let config = DatabaseConfig::default();
/// assert_eq!(config.block_size, 4096);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Directory holding all heap and index files.
    pub data_dir: PathBuf,

    /// Size of each storage block in bytes. Must be a power of 2.
    pub block_size: usize,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            block_size: DEFAULT_BLOCK_SIZE,
        }
    }
}

impl DatabaseConfig {
    /// Creates a configuration with the specified data directory.
    #[must_use]
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Default::default()
        }
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.block_size < MIN_BLOCK_SIZE {
            return Err(format!(
                "block_size must be at least {} bytes",
                MIN_BLOCK_SIZE
            ));
        }
        if self.block_size > MAX_BLOCK_SIZE {
            return Err(format!(
                "block_size must be at most {} bytes",
                MAX_BLOCK_SIZE
            ));
        }
        if !self.block_size.is_power_of_two() {
            return Err("block_size must be a power of 2".to_string());
        }
        Ok(())
    }
}
