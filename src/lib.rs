//! SaveKit integration module
//!
//! This module wires configuration, logging, the shared serializer and the
//! file and preference storage providers into a single [`SaveKit`] handle.

use std::fmt;
use std::sync::Arc;
use tracing::info;

pub use savekit_common::{Error, Result, StorageKey};
pub use savekit_config::{ConfigManager, SaveKitConfig, SerializationFormat, StorageConfig, WriteMode};
pub use savekit_storage::{
    FilePreferenceStore, FileStorageProvider, JsonSerializationProvider, MemoryPreferenceStore,
    PreferenceStorageProvider, PreferenceStore, PreferenceValue, SerializationProvider, Shape,
    StorageProvider,
};

/// File storage with the JSON serializer
pub type FileStorage = FileStorageProvider<JsonSerializationProvider>;

/// File-backed preference storage with the JSON serializer
pub type PreferenceStorage = PreferenceStorageProvider<JsonSerializationProvider, FilePreferenceStore>;

/// Configured storage providers sharing one serializer
pub struct SaveKit {
    /// Configuration the providers were built from
    config: SaveKitConfig,

    /// Serializer shared by both providers
    serializer: Arc<JsonSerializationProvider>,

    /// File storage provider
    files: FileStorage,

    /// Preference storage provider
    preferences: PreferenceStorage,
}

impl SaveKit {
    /// Creates the providers described by `config`
    ///
    /// Initializes logging, creates the storage root and opens the
    /// preference document. Fails with a configuration error when the
    /// storage root cannot be created.
    pub fn new(config: SaveKitConfig) -> Result<Self> {
        savekit_config::validate(&config)?;
        savekit_logging::init_logging(&config.logging)?;

        let serializer = Arc::new(JsonSerializationProvider::from_format(config.storage.format));
        let files = FileStorageProvider::from_config(Arc::clone(&serializer), &config.storage)?;

        let preference_file = config.preferences.resolve_file(&config.storage)?;
        let store = Arc::new(FilePreferenceStore::open(&preference_file)?);
        let preferences = PreferenceStorageProvider::new(
            store,
            Arc::clone(&serializer),
            config.preferences.namespace.clone(),
        )?;

        info!(
            root = %files.root().display(),
            preferences = %preference_file.display(),
            write_mode = %config.storage.write_mode,
            "SaveKit initialized"
        );

        Ok(Self {
            config,
            serializer,
            files,
            preferences,
        })
    }

    /// Loads configuration from the default sources and creates the providers
    pub fn from_env() -> Result<Self> {
        Self::new(ConfigManager::new()?.into_config())
    }

    /// Gets the configuration
    pub fn config(&self) -> &SaveKitConfig {
        &self.config
    }

    /// Gets the shared serializer
    pub fn serializer(&self) -> Arc<JsonSerializationProvider> {
        Arc::clone(&self.serializer)
    }

    /// Gets the file storage provider
    pub fn files(&self) -> &FileStorage {
        &self.files
    }

    /// Gets the preference storage provider
    pub fn preferences(&self) -> &PreferenceStorage {
        &self.preferences
    }

    /// Persists pending preference changes
    pub fn flush(&self) -> Result<()> {
        self.preferences.save_preferences()
    }
}

impl fmt::Debug for SaveKit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SaveKit")
            .field("files", &self.files)
            .field("preferences", &self.preferences)
            .finish()
    }
}
