//! Error types for the common crate
//!
//! This module defines the error type shared by every SaveKit storage provider.

use thiserror::Error;

/// Result type for SaveKit operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for SaveKit operations
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error, raised when the storage root cannot be
    /// created or the configuration cannot be loaded
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// No value is stored under the key
    #[error("Not found: {0}")]
    NotFound(String),

    /// A value could not be encoded
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Stored bytes do not match the requested shape, or are corrupt
    #[error("Deserialization error: {0}")]
    Deserialization(String),

    /// Key rejected by validation
    #[error("Invalid key: {0}")]
    InvalidKey(String),
}

impl Error {
    /// Returns true if the error is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }

    /// Returns true if the error is a deserialization error
    pub fn is_deserialization(&self) -> bool {
        matches!(self, Error::Deserialization(_))
    }

    /// Returns true if the error is an invalid key error
    pub fn is_invalid_key(&self) -> bool {
        matches!(self, Error::InvalidKey(_))
    }

    /// Returns true if the error is a configuration error
    pub fn is_configuration(&self) -> bool {
        matches!(self, Error::Configuration(_))
    }

    /// Maps an IO error raised while accessing `key`, turning a missing
    /// file into [`Error::NotFound`]
    pub fn from_io_for_key(err: std::io::Error, key: &str) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            Error::NotFound(key.to_string())
        } else {
            Error::Io(err)
        }
    }
}
