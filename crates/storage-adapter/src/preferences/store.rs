//! Preference stores
//!
//! A [`PreferenceStore`] stands in for an OS key-value preference API: a
//! flat map of names to strings, integers and floats, persisted when
//! flushed.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use dashmap::DashMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use savekit_common::{Error, Result};

/// A single preference entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum PreferenceValue {
    /// String value
    String(String),
    /// Integer value
    Int(i32),
    /// Float value
    Float(f32),
}

impl PreferenceValue {
    /// Gets the string value, if this is a string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PreferenceValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Gets the integer value, if this is an integer
    pub fn as_int(&self) -> Option<i32> {
        match self {
            PreferenceValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Gets the float value, if this is a float
    pub fn as_float(&self) -> Option<f32> {
        match self {
            PreferenceValue::Float(f) => Some(*f),
            _ => None,
        }
    }
}

/// Platform key-value preference API
pub trait PreferenceStore: Send + Sync {
    /// Gets the entry for `name`
    fn get(&self, name: &str) -> Option<PreferenceValue>;

    /// Sets the entry for `name`
    fn set(&self, name: &str, value: PreferenceValue);

    /// Removes the entry for `name`, returning whether one existed
    fn delete_key(&self, name: &str) -> bool;

    /// Lists every entry name
    fn keys(&self) -> Vec<String>;

    /// Persists pending changes
    fn flush(&self) -> Result<()>;

    /// Returns true if an entry exists for `name`
    fn has_key(&self, name: &str) -> bool {
        self.get(name).is_some()
    }
}

/// Process-local preference store
#[derive(Debug, Default)]
pub struct MemoryPreferenceStore {
    values: DashMap<String, PreferenceValue>,
}

impl MemoryPreferenceStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferenceStore for MemoryPreferenceStore {
    fn get(&self, name: &str) -> Option<PreferenceValue> {
        self.values.get(name).map(|entry| entry.value().clone())
    }

    fn set(&self, name: &str, value: PreferenceValue) {
        self.values.insert(name.to_string(), value);
    }

    fn delete_key(&self, name: &str) -> bool {
        self.values.remove(name).is_some()
    }

    fn keys(&self) -> Vec<String> {
        self.values.iter().map(|entry| entry.key().clone()).collect()
    }

    fn flush(&self) -> Result<()> {
        Ok(())
    }

    fn has_key(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }
}

/// Preference store persisted as a single JSON document
///
/// The document is read once when the store is opened and rewritten on
/// every [`PreferenceStore::flush`] via a temporary file and rename.
#[derive(Debug)]
pub struct FilePreferenceStore {
    /// Document location
    path: PathBuf,

    /// Current entries
    values: RwLock<BTreeMap<String, PreferenceValue>>,
}

impl FilePreferenceStore {
    /// Opens the document at `path`, starting empty if it does not exist
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        let values: BTreeMap<String, PreferenceValue> = match fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                Error::Deserialization(format!(
                    "preference document {} is corrupt: {}",
                    path.display(),
                    e
                ))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };

        debug!(path = %path.display(), entries = values.len(), "Opened preference store");

        Ok(Self {
            path,
            values: RwLock::new(values),
        })
    }

    /// Gets the document location
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PreferenceStore for FilePreferenceStore {
    fn get(&self, name: &str) -> Option<PreferenceValue> {
        self.values.read().get(name).cloned()
    }

    fn set(&self, name: &str, value: PreferenceValue) {
        self.values.write().insert(name.to_string(), value);
    }

    fn delete_key(&self, name: &str) -> bool {
        self.values.write().remove(name).is_some()
    }

    fn keys(&self) -> Vec<String> {
        self.values.read().keys().cloned().collect()
    }

    fn flush(&self) -> Result<()> {
        let bytes = {
            let values = self.values.read();
            serde_json::to_vec_pretty(&*values).map_err(|e| Error::Serialization(e.to_string()))?
        };

        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)?;

        let mut temp = tempfile::NamedTempFile::new_in(&dir)?;
        temp.write_all(&bytes)?;
        temp.as_file().sync_all()?;
        temp.persist(&self.path).map_err(|e| e.error)?;

        info!(path = %self.path.display(), bytes = bytes.len(), "Flushed preferences");
        Ok(())
    }
}
