//! Configuration loading
//!
//! Sources are layered in order: built-in defaults, an optional TOML file,
//! then environment variables. Environment keys use a `SAVEKIT_` prefix and
//! a double underscore between sections, e.g. `SAVEKIT_STORAGE__PATH=saves`.

use std::path::{Path, PathBuf};
use config::{Config, Environment, File, FileFormat};
use tracing::debug;

use savekit_common::{Error, Result};

use crate::schema::SaveKitConfig;
use crate::validation::validate;

/// Environment variable prefix
pub const ENV_PREFIX: &str = "SAVEKIT";

/// Loads and holds the SaveKit configuration
#[derive(Debug, Clone)]
pub struct ConfigManager {
    /// Loaded configuration
    config: SaveKitConfig,

    /// File the configuration was read from, if any
    source: Option<PathBuf>,
}

impl ConfigManager {
    /// Loads defaults overridden by the environment
    pub fn new() -> Result<Self> {
        Self::load(None)
    }

    /// Loads defaults, then `path` (required when given), then the environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with_prefix(path, ENV_PREFIX)
    }

    /// Like [`ConfigManager::load`] with a custom environment prefix
    pub fn load_with_prefix(path: Option<&Path>, env_prefix: &str) -> Result<Self> {
        let mut builder = Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix(env_prefix)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder
            .build()
            .and_then(|c| c.try_deserialize::<SaveKitConfig>())
            .map_err(|e| Error::Configuration(e.to_string()))?;

        validate(&config)?;

        debug!(source = ?path, "Loaded configuration");

        Ok(Self {
            config,
            source: path.map(Path::to_path_buf),
        })
    }

    /// Parses configuration from a TOML string, without environment overrides
    pub fn from_toml_str(toml: &str) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()
            .and_then(|c| c.try_deserialize::<SaveKitConfig>())
            .map_err(|e| Error::Configuration(e.to_string()))?;

        validate(&config)?;

        Ok(Self { config, source: None })
    }

    /// Wraps an already-built configuration after validating it
    pub fn from_config(config: SaveKitConfig) -> Result<Self> {
        validate(&config)?;
        Ok(Self { config, source: None })
    }

    /// Gets the configuration
    pub fn config(&self) -> &SaveKitConfig {
        &self.config
    }

    /// Consumes the manager, returning the configuration
    pub fn into_config(self) -> SaveKitConfig {
        self.config
    }

    /// Gets the file the configuration was read from
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }
}
