//! File-backed storage provider
//!
//! Each key maps to exactly one file, named exactly as the key, directly
//! under the provider's root directory. There is no manifest or index: the
//! directory listing is the index.
//!
//! Saves serialize the value fully into memory before touching the file,
//! so a write is never interleaved with partial serializer output. With
//! [`WriteMode::Truncate`] a crash between truncate and the final flush can
//! leave the file empty or short, and a later load then fails with a
//! deserialization error. [`WriteMode::Atomic`] writes to a temporary file
//! in the root and renames it over the key's file instead.
//!
//! Every file handle is scoped to a single operation and dropped before the
//! operation returns, on success and on failure.

use std::any::Any;
use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{debug, info, warn};
use uuid::Uuid;

use savekit_common::{Error, Result, StorageKey};
use savekit_config::schema::resolve_segment;
use savekit_config::{StorageConfig, WriteMode};

use crate::provider::StorageProvider;
use crate::serialization::{SerializationProvider, Shape};

/// Suffix of in-flight temporary files written by atomic saves
const TEMP_SUFFIX: &str = ".tmp";

/// Length of the hex id embedded in temporary file names
const TEMP_ID_LEN: usize = 32;

/// Builds the temporary file name an atomic save of `key` writes to
fn temp_file_name(key: &str) -> String {
    format!(".{}.{}{}", key, Uuid::new_v4().simple(), TEMP_SUFFIX)
}

/// Returns true for names produced by atomic saves (`.<key>.<id>.tmp`)
fn is_temp_file_name(name: &str) -> bool {
    let inner = match name
        .strip_prefix('.')
        .and_then(|rest| rest.strip_suffix(TEMP_SUFFIX))
    {
        Some(inner) => inner,
        None => return false,
    };

    match inner.rsplit_once('.') {
        Some((key, id)) => {
            !key.is_empty()
                && id.len() == TEMP_ID_LEN
                && id.bytes().all(|b| b.is_ascii_hexdigit())
        }
        None => false,
    }
}

/// Storage provider that keeps one file per key under a root directory
pub struct FileStorageProvider<S> {
    /// Root directory, created at construction
    root: PathBuf,

    /// Shared serializer
    serializer: Arc<S>,

    /// How saves replace existing files
    write_mode: WriteMode,
}

impl<S: SerializationProvider> FileStorageProvider<S> {
    /// Creates a provider rooted at the platform persistent-data directory,
    /// or at `path` below it
    pub fn new(serializer: Arc<S>, path: Option<&str>) -> Result<Self> {
        let base = StorageConfig::default().persistent_data_dir()?;
        Self::with_base(serializer, base, path)
    }

    /// Creates a provider rooted at `base`, or at `path` below it
    pub fn with_base(serializer: Arc<S>, base: impl AsRef<Path>, path: Option<&str>) -> Result<Self> {
        let root = resolve_segment(base.as_ref(), path);
        Self::with_root(serializer, root)
    }

    /// Creates a provider from storage configuration
    pub fn from_config(serializer: Arc<S>, config: &StorageConfig) -> Result<Self> {
        let root = config.resolve_root()?;
        Ok(Self::with_root(serializer, root)?.with_write_mode(config.write_mode))
    }

    /// Creates a provider bound to `root`, creating the directory and any
    /// missing ancestors
    pub fn with_root(serializer: Arc<S>, root: PathBuf) -> Result<Self> {
        if !root.is_dir() {
            fs::create_dir_all(&root).map_err(|e| {
                Error::Configuration(format!(
                    "cannot create storage root {}: {}",
                    root.display(),
                    e
                ))
            })?;
            info!(root = %root.display(), "Created storage root");
        }

        Ok(Self {
            root,
            serializer,
            write_mode: WriteMode::default(),
        })
    }

    /// Sets the write mode
    pub fn with_write_mode(mut self, write_mode: WriteMode) -> Self {
        self.write_mode = write_mode;
        self
    }
}

impl<S> FileStorageProvider<S> {
    /// Gets the root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Gets the shared serializer
    pub fn serializer(&self) -> &Arc<S> {
        &self.serializer
    }

    /// Gets the write mode
    pub fn write_mode(&self) -> WriteMode {
        self.write_mode
    }

    /// Returns the on-disk location of `key`
    ///
    /// This is a plain join of root and key; the key is not validated.
    pub fn get_file_path(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }

    /// Lists the keys currently stored, in sorted order
    pub fn keys(&self) -> Result<Vec<String>> {
        let mut keys = Vec::new();

        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if !is_temp_file_name(name) {
                    keys.push(name.to_string());
                }
            }
        }

        keys.sort();
        Ok(keys)
    }

    /// Async form of [`FileStorageProvider::keys`]
    pub async fn keys_async(&self) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.root).await?;

        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if !is_temp_file_name(name) {
                    keys.push(name.to_string());
                }
            }
        }

        keys.sort();
        Ok(keys)
    }

    /// Reads the raw payload stored under `key`
    pub fn read_bytes(&self, key: &str) -> Result<Vec<u8>> {
        let path = self.checked_path(key)?;
        fs::read(&path).map_err(|e| Error::from_io_for_key(e, key))
    }

    /// Async form of [`FileStorageProvider::read_bytes`]
    ///
    /// Opens the file for shared reading, sizes the buffer to the file's
    /// current length and fills it, releasing the handle before returning.
    pub async fn read_bytes_async(&self, key: &str) -> Result<Vec<u8>> {
        let path = self.checked_path(key)?;
        let mut file = tokio::fs::File::open(&path)
            .await
            .map_err(|e| Error::from_io_for_key(e, key))?;

        let len = file.metadata().await?.len() as usize;
        let mut buffer = Vec::with_capacity(len);
        file.read_to_end(&mut buffer).await?;

        Ok(buffer)
    }

    /// Writes a raw payload under `key`, honoring the write mode
    pub fn write_bytes(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let path = self.checked_path(key)?;

        match self.write_mode {
            WriteMode::Truncate => fs::write(&path, bytes)?,
            WriteMode::Atomic => {
                let mut temp = tempfile::Builder::new()
                    .prefix(&temp_file_name(key))
                    .rand_bytes(0)
                    .tempfile_in(&self.root)?;
                temp.write_all(bytes)?;
                temp.as_file().sync_all()?;
                temp.persist(&path).map_err(|e| e.error)?;
            }
        }

        Ok(())
    }

    /// Async form of [`FileStorageProvider::write_bytes`]
    pub async fn write_bytes_async(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let path = self.checked_path(key)?;

        match self.write_mode {
            WriteMode::Truncate => write_file_async(&path, bytes, false).await?,
            WriteMode::Atomic => {
                let temp = self.root.join(temp_file_name(key));

                let result = match write_file_async(&temp, bytes, true).await {
                    Ok(()) => tokio::fs::rename(&temp, &path).await,
                    Err(e) => Err(e),
                };

                if let Err(e) = result {
                    let _ = tokio::fs::remove_file(&temp).await;
                    return Err(e.into());
                }
            }
        }

        Ok(())
    }

    /// Validates `key` and maps it to its file
    fn checked_path(&self, key: &str) -> Result<PathBuf> {
        StorageKey::validate(key)?;
        Ok(self.get_file_path(key))
    }

    /// Removes every regular file directly under the root, returning how
    /// many were removed
    fn remove_all_files(&self) -> Result<usize> {
        let mut removed = 0;

        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                remove_if_present(fs::remove_file(entry.path()))?;
                removed += 1;
            }
        }

        Ok(removed)
    }

    async fn remove_all_files_async(&self) -> Result<usize> {
        let mut removed = 0;
        let mut entries = tokio::fs::read_dir(&self.root).await?;

        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_file() {
                remove_if_present(tokio::fs::remove_file(entry.path()).await)?;
                removed += 1;
            }
        }

        Ok(removed)
    }
}

/// Opens `path` for writing (truncating, or requiring a fresh file when
/// `create_new`), writes the whole buffer and flushes it
async fn write_file_async(path: &Path, bytes: &[u8], create_new: bool) -> io::Result<()> {
    let mut options = tokio::fs::OpenOptions::new();
    options.write(true);
    if create_new {
        options.create_new(true);
    } else {
        options.create(true).truncate(true);
    }

    let mut file = options.open(path).await?;
    file.write_all(bytes).await?;
    file.flush().await?;
    if create_new {
        file.sync_all().await?;
    }

    Ok(())
}

/// Treats a file that vanished between listing and removal as removed
fn remove_if_present(result: io::Result<()>) -> Result<()> {
    match result {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e.into()),
        _ => Ok(()),
    }
}

#[async_trait]
impl<S: SerializationProvider> StorageProvider for FileStorageProvider<S> {
    fn exists(&self, key: &str) -> bool {
        StorageKey::is_valid(key) && self.get_file_path(key).is_file()
    }

    fn save<T: Serialize + Sync>(&self, key: &str, value: &T) -> Result<()> {
        StorageKey::validate(key)?;
        let bytes = self.serializer.serialize(value)?;
        self.write_bytes(key, &bytes)?;

        debug!(key, bytes = bytes.len(), mode = %self.write_mode, "Saved value");
        Ok(())
    }

    fn load<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        let bytes = self.read_bytes(key)?;
        debug!(key, bytes = bytes.len(), "Loaded value");
        self.serializer.deserialize(&bytes)
    }

    fn load_shape(&self, key: &str, shape: &Shape) -> Result<Box<dyn Any + Send>> {
        let bytes = self.read_bytes(key)?;
        debug!(key, bytes = bytes.len(), shape = shape.name(), "Loaded value");
        self.serializer.deserialize_shape(&bytes, shape)
    }

    fn copy(&self, from_key: &str, to_key: &str) -> Result<()> {
        let from = self.checked_path(from_key)?;
        let to = self.checked_path(to_key)?;

        if !from.is_file() {
            warn!(from_key, to_key, "Copy source does not exist, skipping");
            return Ok(());
        }
        if from == to {
            debug!(from_key, "Copy onto the same key, nothing to do");
            return Ok(());
        }

        match self.write_mode {
            WriteMode::Truncate => {
                fs::copy(&from, &to)?;
            }
            WriteMode::Atomic => {
                let bytes = fs::read(&from)?;
                self.write_bytes(to_key, &bytes)?;
            }
        }

        debug!(from_key, to_key, "Copied value");
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<bool> {
        let path = self.checked_path(key)?;

        if !path.is_file() {
            return Ok(false);
        }

        match fs::remove_file(&path) {
            Ok(()) => {
                debug!(key, "Deleted value");
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn delete_all(&self) -> Result<()> {
        let removed = self.remove_all_files()?;
        info!(root = %self.root.display(), removed, "Deleted all values");
        Ok(())
    }

    async fn exists_async(&self, key: &str) -> bool {
        if !StorageKey::is_valid(key) {
            return false;
        }

        tokio::fs::metadata(self.get_file_path(key))
            .await
            .map(|m| m.is_file())
            .unwrap_or(false)
    }

    async fn save_async<T: Serialize + Sync>(&self, key: &str, value: &T) -> Result<()> {
        StorageKey::validate(key)?;
        let bytes = self.serializer.serialize_async(value).await?;
        self.write_bytes_async(key, &bytes).await?;

        debug!(key, bytes = bytes.len(), mode = %self.write_mode, "Saved value");
        Ok(())
    }

    async fn load_async<T: DeserializeOwned + Send>(&self, key: &str) -> Result<T> {
        let bytes = self.read_bytes_async(key).await?;
        debug!(key, bytes = bytes.len(), "Loaded value");
        self.serializer.deserialize_async(bytes).await
    }

    async fn load_shape_async(&self, key: &str, shape: &Shape) -> Result<Box<dyn Any + Send>> {
        let bytes = self.read_bytes_async(key).await?;
        debug!(key, bytes = bytes.len(), shape = shape.name(), "Loaded value");
        self.serializer.deserialize_shape_async(bytes, shape).await
    }

    async fn copy_async(&self, from_key: &str, to_key: &str) -> Result<()> {
        let from = self.checked_path(from_key)?;
        let to = self.checked_path(to_key)?;

        if !self.exists_async(from_key).await {
            warn!(from_key, to_key, "Copy source does not exist, skipping");
            return Ok(());
        }
        if from == to {
            debug!(from_key, "Copy onto the same key, nothing to do");
            return Ok(());
        }

        match self.write_mode {
            WriteMode::Truncate => {
                tokio::fs::copy(&from, &to).await?;
            }
            WriteMode::Atomic => {
                let bytes = tokio::fs::read(&from).await?;
                self.write_bytes_async(to_key, &bytes).await?;
            }
        }

        debug!(from_key, to_key, "Copied value");
        Ok(())
    }

    async fn delete_async(&self, key: &str) -> Result<bool> {
        let path = self.checked_path(key)?;

        if !self.exists_async(key).await {
            return Ok(false);
        }

        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                debug!(key, "Deleted value");
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete_all_async(&self) -> Result<()> {
        let removed = self.remove_all_files_async().await?;
        info!(root = %self.root.display(), removed, "Deleted all values");
        Ok(())
    }
}

impl<S> Clone for FileStorageProvider<S> {
    fn clone(&self) -> Self {
        Self {
            root: self.root.clone(),
            serializer: Arc::clone(&self.serializer),
            write_mode: self.write_mode,
        }
    }
}

impl<S> fmt::Debug for FileStorageProvider<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileStorageProvider")
            .field("root", &self.root)
            .field("write_mode", &self.write_mode)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serialization::JsonSerializationProvider;
    use serde::Deserialize;
    use tempfile::TempDir;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct PlayerData {
        level: u32,
    }

    fn provider(dir: &TempDir) -> FileStorageProvider<JsonSerializationProvider> {
        FileStorageProvider::with_base(
            Arc::new(JsonSerializationProvider::new()),
            dir.path(),
            Some("saves"),
        )
        .unwrap()
    }

    #[test]
    fn test_construction_creates_root() {
        let dir = TempDir::new().unwrap();
        let storage = FileStorageProvider::with_base(
            Arc::new(JsonSerializationProvider::new()),
            dir.path(),
            Some("profiles/slot1"),
        )
        .unwrap();

        assert!(storage.root().is_dir());
        assert_eq!(storage.root(), dir.path().join("profiles/slot1"));
        assert_eq!(storage.get_file_path("player1"), dir.path().join("profiles/slot1/player1"));
    }

    #[test]
    fn test_empty_path_uses_base() {
        let dir = TempDir::new().unwrap();
        let storage = FileStorageProvider::with_base(
            Arc::new(JsonSerializationProvider::new()),
            dir.path(),
            Some(""),
        )
        .unwrap();
        assert_eq!(storage.root(), dir.path());
    }

    #[test]
    fn test_uncreatable_root_is_configuration_error() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, b"not a directory").unwrap();

        let err = FileStorageProvider::with_base(
            Arc::new(JsonSerializationProvider::new()),
            &blocker,
            Some("saves"),
        )
        .unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_from_config() {
        let dir = TempDir::new().unwrap();
        let config = StorageConfig {
            path: Some("saves".to_string()),
            write_mode: WriteMode::Atomic,
            ..StorageConfig::with_base_dir(dir.path())
        };

        let storage =
            FileStorageProvider::from_config(Arc::new(JsonSerializationProvider::new()), &config)
                .unwrap();
        assert_eq!(storage.root(), dir.path().join("saves"));
        assert_eq!(storage.write_mode(), WriteMode::Atomic);
    }

    #[test]
    fn test_round_trip_and_existence() {
        let dir = TempDir::new().unwrap();
        let storage = provider(&dir);

        assert!(!storage.exists("player1"));
        storage.save("player1", &PlayerData { level: 5 }).unwrap();
        assert!(storage.exists("player1"));
        assert_eq!(storage.load::<PlayerData>("player1").unwrap(), PlayerData { level: 5 });

        assert!(storage.delete("player1").unwrap());
        assert!(!storage.exists("player1"));
    }

    #[test]
    fn test_payload_is_exactly_the_serialized_bytes() {
        let dir = TempDir::new().unwrap();
        let storage = provider(&dir);

        storage.save("player1", &PlayerData { level: 5 }).unwrap();
        let on_disk = fs::read(storage.get_file_path("player1")).unwrap();
        assert_eq!(on_disk, br#"{"level":5}"#);
    }

    #[test]
    fn test_overwrite_replaces_entire_file() {
        let dir = TempDir::new().unwrap();
        let storage = provider(&dir);

        storage.save("notes", &"a much longer first value".to_string()).unwrap();
        storage.save("notes", &"short".to_string()).unwrap();
        assert_eq!(storage.load::<String>("notes").unwrap(), "short");
    }

    #[test]
    fn test_missing_key_is_not_found() {
        let dir = TempDir::new().unwrap();
        let storage = provider(&dir);

        let err = storage.load::<PlayerData>("never_saved").unwrap_err();
        assert!(err.is_not_found(), "unexpected error: {}", err);
    }

    #[test]
    fn test_truncated_file_is_deserialization_error() {
        let dir = TempDir::new().unwrap();
        let storage = provider(&dir);

        fs::write(storage.get_file_path("player1"), b"").unwrap();
        assert!(storage.load::<PlayerData>("player1").unwrap_err().is_deserialization());

        fs::write(storage.get_file_path("player1"), br#"{"lev"#).unwrap();
        assert!(storage.load::<PlayerData>("player1").unwrap_err().is_deserialization());
    }

    #[test]
    fn test_wrong_shape_is_deserialization_error() {
        let dir = TempDir::new().unwrap();
        let storage = provider(&dir);

        storage.save("player1", &vec![1, 2, 3]).unwrap();
        assert!(storage.load::<PlayerData>("player1").unwrap_err().is_deserialization());
    }

    #[test]
    fn test_load_shape() {
        let dir = TempDir::new().unwrap();
        let storage = provider(&dir);
        storage.save("player1", &PlayerData { level: 9 }).unwrap();

        let shape = Shape::of::<PlayerData>();
        let value = storage.load_shape("player1", &shape).unwrap();
        assert_eq!(value.downcast_ref::<PlayerData>(), Some(&PlayerData { level: 9 }));

        let tree = storage
            .load_shape("player1", &Shape::of::<serde_json::Value>())
            .unwrap();
        assert_eq!(
            tree.downcast_ref::<serde_json::Value>(),
            Some(&serde_json::json!({ "level": 9 }))
        );

        assert!(storage.load_shape("missing", &shape).unwrap_err().is_not_found());
    }

    #[test]
    fn test_copy_is_byte_identical() {
        let dir = TempDir::new().unwrap();
        let storage = FileStorageProvider::with_base(
            Arc::new(JsonSerializationProvider::pretty()),
            dir.path(),
            None,
        )
        .unwrap();

        storage.save("player1", &PlayerData { level: 5 }).unwrap();
        storage.copy("player1", "player1_backup").unwrap();

        let original = fs::read(storage.get_file_path("player1")).unwrap();
        let copy = fs::read(storage.get_file_path("player1_backup")).unwrap();
        assert_eq!(original, copy);
        assert_eq!(
            storage.load::<PlayerData>("player1_backup").unwrap(),
            PlayerData { level: 5 }
        );
    }

    #[test]
    fn test_copy_overwrites_destination() {
        let dir = TempDir::new().unwrap();
        let storage = provider(&dir);

        storage.save("a", &PlayerData { level: 1 }).unwrap();
        storage.save("b", &PlayerData { level: 2 }).unwrap();
        storage.copy("a", "b").unwrap();
        assert_eq!(storage.load::<PlayerData>("b").unwrap(), PlayerData { level: 1 });
    }

    #[test]
    fn test_copy_onto_same_key_keeps_value() {
        let dir = TempDir::new().unwrap();
        let storage = provider(&dir);

        storage.save("player1", &PlayerData { level: 5 }).unwrap();
        storage.copy("player1", "player1").unwrap();
        assert_eq!(storage.load::<PlayerData>("player1").unwrap(), PlayerData { level: 5 });

        let atomic = storage.clone().with_write_mode(WriteMode::Atomic);
        atomic.copy("player1", "player1").unwrap();
        assert_eq!(atomic.load::<PlayerData>("player1").unwrap(), PlayerData { level: 5 });
    }

    #[test]
    fn test_copy_missing_source_is_noop() {
        let dir = TempDir::new().unwrap();
        let storage = provider(&dir);

        storage.copy("ghost", "ghost_backup").unwrap();
        assert!(!storage.exists("ghost_backup"));
    }

    #[test]
    fn test_delete_returns_true_exactly_once() {
        let dir = TempDir::new().unwrap();
        let storage = provider(&dir);

        storage.save("player1", &PlayerData { level: 5 }).unwrap();
        assert!(storage.delete("player1").unwrap());
        assert!(!storage.delete("player1").unwrap());
        assert!(!storage.delete("player1").unwrap());

        storage.save("player1", &PlayerData { level: 6 }).unwrap();
        assert!(storage.delete("player1").unwrap());
    }

    #[test]
    fn test_delete_all_keeps_root_and_subdirectories() {
        let dir = TempDir::new().unwrap();
        let storage = provider(&dir);

        storage.save("a", &1).unwrap();
        storage.save("b", &2).unwrap();
        let nested = storage.root().join("nested");
        fs::create_dir(&nested).unwrap();
        fs::write(nested.join("inner"), b"kept").unwrap();

        storage.delete_all().unwrap();

        assert!(!storage.exists("a"));
        assert!(!storage.exists("b"));
        assert!(storage.root().is_dir());
        assert!(nested.join("inner").is_file());
        assert!(storage.keys().unwrap().is_empty());
    }

    #[test]
    fn test_invalid_keys() {
        let dir = TempDir::new().unwrap();
        let storage = provider(&dir);

        assert!(!storage.exists("../escape"));
        assert!(storage.save("../escape", &1).unwrap_err().is_invalid_key());
        assert!(storage.save("", &1).unwrap_err().is_invalid_key());
        assert!(storage.load::<u32>("a/b").unwrap_err().is_invalid_key());
        assert!(storage.copy("a", "b/c").unwrap_err().is_invalid_key());
        assert!(storage.delete("..").unwrap_err().is_invalid_key());
        assert!(!dir.path().join("escape").exists());
    }

    #[test]
    fn test_keys_lists_files_only() {
        let dir = TempDir::new().unwrap();
        let storage = provider(&dir);

        storage.save("b", &2).unwrap();
        storage.save("a", &1).unwrap();
        fs::create_dir(storage.root().join("subdir")).unwrap();
        fs::write(storage.root().join(temp_file_name("a")), b"partial").unwrap();

        assert_eq!(storage.keys().unwrap(), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_dotted_keys_are_listed() {
        let dir = TempDir::new().unwrap();
        let storage = provider(&dir);

        storage.save(".slot.tmp", &1).unwrap();
        storage.save(".a.3f2c.tmp", &2).unwrap();

        assert_eq!(
            storage.keys().unwrap(),
            vec![".a.3f2c.tmp".to_string(), ".slot.tmp".to_string()]
        );
        assert_eq!(storage.load::<u32>(".slot.tmp").unwrap(), 1);
    }

    #[test]
    fn test_temp_file_names() {
        assert!(is_temp_file_name(&temp_file_name("player1")));
        assert!(is_temp_file_name(&temp_file_name(".slot.tmp")));
        assert!(!is_temp_file_name(".slot.tmp"));
        assert!(!is_temp_file_name("player1"));
        assert!(!is_temp_file_name(&format!(".{}.tmp", "0".repeat(TEMP_ID_LEN))));
    }

    #[test]
    fn test_atomic_mode_round_trip_leaves_no_temp_files() {
        let dir = TempDir::new().unwrap();
        let storage = provider(&dir).with_write_mode(WriteMode::Atomic);

        storage.save("player1", &PlayerData { level: 1 }).unwrap();
        storage.save("player1", &PlayerData { level: 2 }).unwrap();
        storage.copy("player1", "player1_backup").unwrap();

        assert_eq!(storage.load::<PlayerData>("player1").unwrap(), PlayerData { level: 2 });
        assert_eq!(
            storage.load::<PlayerData>("player1_backup").unwrap(),
            PlayerData { level: 2 }
        );

        let names: Vec<_> = fs::read_dir(storage.root())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names.len(), 2, "unexpected entries: {:?}", names);
    }

    #[test]
    fn test_scenario() {
        let dir = TempDir::new().unwrap();
        let storage = provider(&dir);

        storage.save("player1", &PlayerData { level: 5 }).unwrap();
        assert!(storage.exists("player1"));
        assert_eq!(storage.load::<PlayerData>("player1").unwrap(), PlayerData { level: 5 });

        storage.copy("player1", "player1_backup").unwrap();
        assert_eq!(
            storage.load::<PlayerData>("player1_backup").unwrap(),
            PlayerData { level: 5 }
        );

        storage.delete_all().unwrap();
        assert!(!storage.exists("player1"));
        assert!(!storage.exists("player1_backup"));
        assert!(storage.root().is_dir());
    }

    #[tokio::test]
    async fn test_async_round_trip() {
        let dir = TempDir::new().unwrap();
        let storage = provider(&dir);

        assert!(!storage.exists_async("player1").await);
        storage.save_async("player1", &PlayerData { level: 5 }).await.unwrap();
        assert!(storage.exists_async("player1").await);

        let loaded: PlayerData = storage.load_async("player1").await.unwrap();
        assert_eq!(loaded, PlayerData { level: 5 });

        let shaped = storage
            .load_shape_async("player1", &Shape::of::<PlayerData>())
            .await
            .unwrap();
        assert_eq!(shaped.downcast_ref::<PlayerData>(), Some(&PlayerData { level: 5 }));
    }

    #[tokio::test]
    async fn test_sync_and_async_paths_agree() {
        let dir = TempDir::new().unwrap();
        let storage = provider(&dir);

        storage.save("sync", &PlayerData { level: 3 }).unwrap();
        storage.save_async("async", &PlayerData { level: 3 }).await.unwrap();

        assert_eq!(
            fs::read(storage.get_file_path("sync")).unwrap(),
            fs::read(storage.get_file_path("async")).unwrap()
        );
        assert_eq!(
            storage.load_async::<PlayerData>("sync").await.unwrap(),
            storage.load::<PlayerData>("async").unwrap()
        );
    }

    #[tokio::test]
    async fn test_async_overwrite_truncates() {
        let dir = TempDir::new().unwrap();
        let storage = provider(&dir);

        storage.save_async("notes", &"a much longer first value".to_string()).await.unwrap();
        storage.save_async("notes", &"short".to_string()).await.unwrap();
        assert_eq!(storage.load_async::<String>("notes").await.unwrap(), "short");
    }

    #[tokio::test]
    async fn test_async_missing_key_is_not_found() {
        let dir = TempDir::new().unwrap();
        let storage = provider(&dir);

        let err = storage.load_async::<PlayerData>("never_saved").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_async_copy_delete_and_delete_all() {
        let dir = TempDir::new().unwrap();
        let storage = provider(&dir);

        storage.copy_async("ghost", "ghost_backup").await.unwrap();
        assert!(!storage.exists_async("ghost_backup").await);

        storage.save_async("player1", &PlayerData { level: 5 }).await.unwrap();
        storage.copy_async("player1", "player1_backup").await.unwrap();
        assert_eq!(
            storage.load_async::<PlayerData>("player1_backup").await.unwrap(),
            PlayerData { level: 5 }
        );

        assert!(storage.delete_async("player1").await.unwrap());
        assert!(!storage.delete_async("player1").await.unwrap());

        storage.delete_all_async().await.unwrap();
        assert!(storage.keys_async().await.unwrap().is_empty());
        assert!(storage.root().is_dir());
    }

    #[tokio::test]
    async fn test_async_copy_onto_same_key_keeps_value() {
        let dir = TempDir::new().unwrap();
        let storage = provider(&dir);

        storage.save_async("player1", &PlayerData { level: 5 }).await.unwrap();
        storage.copy_async("player1", "player1").await.unwrap();
        assert_eq!(
            storage.load_async::<PlayerData>("player1").await.unwrap(),
            PlayerData { level: 5 }
        );
    }

    #[tokio::test]
    async fn test_async_atomic_mode() {
        let dir = TempDir::new().unwrap();
        let storage = provider(&dir).with_write_mode(WriteMode::Atomic);

        storage.save_async("player1", &PlayerData { level: 1 }).await.unwrap();
        storage.save_async("player1", &PlayerData { level: 2 }).await.unwrap();
        storage.copy_async("player1", "player1_backup").await.unwrap();

        assert_eq!(
            storage.load_async::<PlayerData>("player1_backup").await.unwrap(),
            PlayerData { level: 2 }
        );
        assert_eq!(
            storage.keys_async().await.unwrap(),
            vec!["player1".to_string(), "player1_backup".to_string()]
        );
        assert_eq!(fs::read_dir(storage.root()).unwrap().count(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_saves_to_distinct_keys() {
        let dir = TempDir::new().unwrap();
        let storage = Arc::new(provider(&dir));

        let mut handles = Vec::new();
        for i in 0..8u32 {
            let storage = Arc::clone(&storage);
            handles.push(tokio::spawn(async move {
                let key = format!("slot{}", i);
                let data = PlayerData { level: i };
                storage.save_async(&key, &data).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        for i in 0..8u32 {
            let loaded: PlayerData = storage.load(&format!("slot{}", i)).unwrap();
            assert_eq!(loaded, PlayerData { level: i });
        }
    }
}
