//! Configuration management for SaveKit
//!
//! This crate provides the configuration model for storage providers,
//! preferences and logging, and loads it from layered sources (built-in
//! defaults, an optional TOML file, and `SAVEKIT_*` environment variables).

pub mod manager;
pub mod schema;
pub mod validation;

// Re-export commonly used types
pub use manager::ConfigManager;
pub use schema::{
    LoggingConfig, PreferenceConfig, SaveKitConfig, SerializationFormat, StorageConfig, WriteMode,
};
pub use validation::validate;
