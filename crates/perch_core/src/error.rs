//! Error types for perch_core

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading or saving configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file could not be read or written
    #[error("Failed to access config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid TOML or has the wrong shape
    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Config could not be serialized
    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// A value is out of its accepted range
    #[error("Invalid value for `{field}`: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

/// Result type for perch_core operations
pub type Result<T> = std::result::Result<T, ConfigError>;
