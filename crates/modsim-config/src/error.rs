//! Error types for configuration and bench files.

use std::path::PathBuf;

use modsim_core::{LinkError, SimError};
use thiserror::Error;

/// Errors that can occur while loading, saving or building configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read a file
    #[error("failed to read file '{path}': {source}")]
    ReadFile {
        /// Path of the file that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to write a file
    #[error("failed to write file '{path}': {source}")]
    WriteFile {
        /// Path of the file that could not be written.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to create directory
    #[error("failed to create directory '{path}': {source}")]
    CreateDir {
        /// Path of the directory that could not be created.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// Failed to serialize TOML
    #[error("failed to serialize TOML: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// Unknown module type
    #[error("unknown module type: {0}")]
    UnknownModule(String),

    /// Two modules share a label
    #[error("duplicate module label: {0}")]
    DuplicateLabel(String),

    /// Link endpoint is not of the form `label.Port name`
    #[error("bad link endpoint '{0}', expected 'label.Port name'")]
    BadEndpoint(String),

    /// Link endpoint names a module or port that does not exist
    #[error("unknown port '{port}' on module '{module}'")]
    UnknownPort {
        /// Module label.
        module: String,
        /// Port name.
        port: String,
    },

    /// A link was rejected
    #[error("cannot link '{from}' to '{to}': {source}")]
    Link {
        /// Source endpoint as written.
        from: String,
        /// Target endpoint as written.
        to: String,
        /// Why the circuit refused it.
        #[source]
        source: LinkError,
    },

    /// Loading module data or propagating failed
    #[error(transparent)]
    Sim(#[from] SimError),
}

impl ConfigError {
    /// Create a read file error.
    pub fn read_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConfigError::ReadFile {
            path: path.into(),
            source,
        }
    }

    /// Create a write file error.
    pub fn write_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConfigError::WriteFile {
            path: path.into(),
            source,
        }
    }

    /// Create a create directory error.
    pub fn create_dir(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConfigError::CreateDir {
            path: path.into(),
            source,
        }
    }
}
