//! Simulator settings.

use std::path::Path;
use std::time::Duration;

use modsim_core::Circuit;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Simulator settings file.
///
/// # TOML Format
///
/// ```toml
/// tick_interval_us = 250
/// max_history = 500
/// log_filter = "info"
/// ```
///
/// Every key is optional.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SimConfig {
    /// Pause between clock ticks, in microseconds.
    pub tick_interval_us: u64,

    /// Number of undo entries kept.
    pub max_history: usize,

    /// `tracing` filter used when `RUST_LOG` is unset.
    pub log_filter: String,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            tick_interval_us: 250,
            max_history: modsim_core::MAX_HISTORY,
            log_filter: "info".to_string(),
        }
    }
}

impl SimConfig {
    /// Load settings from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
        Self::from_toml(&content)
    }

    /// Load settings from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Convert the settings to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Save the settings to a TOML file, creating the parent directory.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::create_dir(parent, e))?;
        }
        std::fs::write(path, self.to_toml()?).map_err(|e| ConfigError::write_file(path, e))?;
        Ok(())
    }

    /// Pause between clock ticks.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_micros(self.tick_interval_us)
    }

    /// An empty circuit with this history depth.
    pub fn new_circuit(&self) -> Circuit {
        Circuit::with_history_capacity(self.max_history)
    }
}
