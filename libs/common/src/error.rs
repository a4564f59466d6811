//! Custom error types for the common library
//!
//! This module defines the error types raised by local persistence and
//! configuration loading.

use thiserror::Error;

/// Custom error type for local storage operations
#[derive(Error, Debug)]
pub enum StorageError {
    /// Error occurred while reading or writing the storage file
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored data could not be (de)serialized
    #[error("Storage serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Storage configuration error
    #[error("Storage configuration error: {0}")]
    Configuration(String),
}

/// Type alias for Result with StorageError
pub type StorageResult<T> = Result<T, StorageError>;

/// Custom error type for client configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration sources could not be read or merged
    #[error("Configuration load error: {0}")]
    Load(#[from] config::ConfigError),

    /// A value was present but unusable
    #[error("Invalid configuration value for `{key}`: {message}")]
    Invalid { key: String, message: String },
}

/// Type alias for Result with ConfigError
pub type ConfigResult<T> = Result<T, ConfigError>;
