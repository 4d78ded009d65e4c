//! Configuration schema
//!
//! Every section deserializes with defaults, so an empty source yields a
//! usable configuration.

use std::fmt;
use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};

use savekit_common::{Error, Result};

/// Application name used for the platform data directory by default
pub const DEFAULT_APP_NAME: &str = "savekit";

/// Default preference namespace
pub const DEFAULT_PREFERENCE_NAMESPACE: &str = "savekit";

/// Top-level SaveKit configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SaveKitConfig {
    /// File storage settings
    pub storage: StorageConfig,

    /// Preference storage settings
    pub preferences: PreferenceConfig,

    /// Logging settings
    pub logging: LoggingConfig,
}

/// On-disk encoding used by the serialization provider
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SerializationFormat {
    /// Compact JSON
    #[default]
    Json,
    /// Indented JSON
    JsonPretty,
}

/// How a save replaces the previous contents of a key
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteMode {
    /// Create-or-truncate the key's file and write in place. A crash
    /// mid-write can leave the file empty or short.
    #[default]
    Truncate,
    /// Write to a temporary file in the root, then rename it over the
    /// key's file.
    Atomic,
}

impl fmt::Display for WriteMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WriteMode::Truncate => write!(f, "truncate"),
            WriteMode::Atomic => write!(f, "atomic"),
        }
    }
}

/// File storage configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Application name, appended to the platform data directory
    pub app_name: String,

    /// Explicit persistent-data base directory, overriding the platform default
    pub base_dir: Option<PathBuf>,

    /// Path segment below the base directory; empty or absent means the base itself
    pub path: Option<String>,

    /// Serialization format
    pub format: SerializationFormat,

    /// Write mode for saves
    pub write_mode: WriteMode,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            app_name: DEFAULT_APP_NAME.to_string(),
            base_dir: None,
            path: None,
            format: SerializationFormat::default(),
            write_mode: WriteMode::default(),
        }
    }
}

impl StorageConfig {
    /// Creates a storage configuration rooted at an explicit base directory
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: Some(base_dir.into()),
            ..Self::default()
        }
    }

    /// Resolves the persistent-data base directory
    ///
    /// Uses `base_dir` when set, otherwise the platform's local data
    /// directory joined with `app_name`.
    pub fn persistent_data_dir(&self) -> Result<PathBuf> {
        if let Some(base_dir) = &self.base_dir {
            return Ok(base_dir.clone());
        }

        dirs::data_local_dir()
            .map(|dir| dir.join(&self.app_name))
            .ok_or_else(|| {
                Error::Configuration("platform has no local data directory".to_string())
            })
    }

    /// Resolves the storage root: the base directory, or `base/path` when a
    /// path segment is configured
    pub fn resolve_root(&self) -> Result<PathBuf> {
        let base = self.persistent_data_dir()?;
        Ok(resolve_segment(&base, self.path.as_deref()))
    }
}

/// Joins an optional path segment onto a base directory
pub fn resolve_segment(base: &Path, segment: Option<&str>) -> PathBuf {
    match segment {
        Some(segment) if !segment.is_empty() => base.join(segment),
        _ => base.to_path_buf(),
    }
}

/// Preference storage configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreferenceConfig {
    /// Namespace that scopes every key written by the preference provider
    pub namespace: String,

    /// Preference document location; defaults to
    /// `<base>/preferences/preferences.json`
    pub file: Option<PathBuf>,
}

impl Default for PreferenceConfig {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_PREFERENCE_NAMESPACE.to_string(),
            file: None,
        }
    }
}

impl PreferenceConfig {
    /// Resolves the preference document path against the storage base directory
    pub fn resolve_file(&self, storage: &StorageConfig) -> Result<PathBuf> {
        match &self.file {
            Some(file) => Ok(file.clone()),
            None => Ok(storage
                .persistent_data_dir()?
                .join("preferences")
                .join("preferences.json")),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default level filter, overridden by `RUST_LOG`
    pub level: String,

    /// Emit JSON lines instead of human-readable output
    pub json: bool,

    /// Include the event target
    pub with_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            with_target: true,
        }
    }
}
