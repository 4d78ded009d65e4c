//! Preference-backed storage provider
//!
//! Serialized values are stored hex-encoded in string entries. Every name
//! is scoped as `<namespace>/<key>`; `/` cannot appear in a valid key, so
//! providers with different namespaces never see each other's entries.

use std::any::Any;
use std::fmt;
use std::sync::Arc;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};

use savekit_common::{Error, Result, StorageKey};

use crate::preferences::store::{PreferenceStore, PreferenceValue};
use crate::provider::StorageProvider;
use crate::serialization::{SerializationProvider, Shape};

/// Separator between namespace and key
const NAMESPACE_SEPARATOR: char = '/';

/// Storage provider over a [`PreferenceStore`]
pub struct PreferenceStorageProvider<S, P> {
    /// Underlying preference store
    store: Arc<P>,

    /// Shared serializer
    serializer: Arc<S>,

    /// Namespace scoping every entry
    namespace: String,
}

impl<S, P> PreferenceStorageProvider<S, P>
where
    S: SerializationProvider,
    P: PreferenceStore,
{
    /// Creates a provider scoped to `namespace`
    pub fn new(store: Arc<P>, serializer: Arc<S>, namespace: impl Into<String>) -> Result<Self> {
        let namespace = namespace.into();

        if namespace.is_empty() || namespace.contains(NAMESPACE_SEPARATOR) {
            return Err(Error::Configuration(format!(
                "invalid preference namespace '{}'",
                namespace
            )));
        }

        Ok(Self {
            store,
            serializer,
            namespace,
        })
    }

    /// Gets the namespace
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Gets the underlying store
    pub fn store(&self) -> &Arc<P> {
        &self.store
    }

    /// Sets an integer preference
    pub fn set_int(&self, key: &str, value: i32) -> Result<()> {
        self.set_value(key, PreferenceValue::Int(value))
    }

    /// Gets an integer preference, or 0 when missing or not an integer
    pub fn get_int(&self, key: &str) -> i32 {
        self.get_int_or(key, 0)
    }

    /// Gets an integer preference, or `default` when missing or not an integer
    pub fn get_int_or(&self, key: &str, default: i32) -> i32 {
        self.get_value(key).and_then(|v| v.as_int()).unwrap_or(default)
    }

    /// Sets a float preference
    pub fn set_float(&self, key: &str, value: f32) -> Result<()> {
        self.set_value(key, PreferenceValue::Float(value))
    }

    /// Gets a float preference, or 0.0 when missing or not a float
    pub fn get_float(&self, key: &str) -> f32 {
        self.get_float_or(key, 0.0)
    }

    /// Gets a float preference, or `default` when missing or not a float
    pub fn get_float_or(&self, key: &str, default: f32) -> f32 {
        self.get_value(key).and_then(|v| v.as_float()).unwrap_or(default)
    }

    /// Sets a string preference
    pub fn set_string(&self, key: &str, value: impl Into<String>) -> Result<()> {
        self.set_value(key, PreferenceValue::String(value.into()))
    }

    /// Gets a string preference, or an empty string when missing or not a string
    pub fn get_string(&self, key: &str) -> String {
        self.get_string_or(key, "")
    }

    /// Gets a string preference, or `default` when missing or not a string
    pub fn get_string_or(&self, key: &str, default: &str) -> String {
        self.get_value(key)
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_else(|| default.to_string())
    }

    /// Persists pending changes to the platform store
    pub fn save_preferences(&self) -> Result<()> {
        self.store.flush()
    }

    /// Maps a key to its scoped entry name
    fn scoped(&self, key: &str) -> String {
        format!("{}{}{}", self.namespace, NAMESPACE_SEPARATOR, key)
    }

    fn checked_name(&self, key: &str) -> Result<String> {
        StorageKey::validate(key)?;
        Ok(self.scoped(key))
    }

    fn set_value(&self, key: &str, value: PreferenceValue) -> Result<()> {
        let name = self.checked_name(key)?;
        self.store.set(&name, value);
        Ok(())
    }

    fn get_value(&self, key: &str) -> Option<PreferenceValue> {
        if !StorageKey::is_valid(key) {
            return None;
        }
        self.store.get(&self.scoped(key))
    }

    fn write_payload(&self, key: &str, bytes: &[u8]) -> Result<()> {
        self.set_value(key, PreferenceValue::String(hex::encode(bytes)))?;
        debug!(key, bytes = bytes.len(), namespace = %self.namespace, "Saved preference value");
        Ok(())
    }

    fn read_payload(&self, key: &str) -> Result<Vec<u8>> {
        let name = self.checked_name(key)?;

        match self.store.get(&name) {
            Some(PreferenceValue::String(encoded)) => hex::decode(encoded).map_err(|e| {
                Error::Deserialization(format!("'{}' does not hold a serialized value: {}", key, e))
            }),
            Some(other) => Err(Error::Deserialization(format!(
                "'{}' holds {:?}, not a serialized value",
                key, other
            ))),
            None => Err(Error::NotFound(key.to_string())),
        }
    }

    /// Names of every entry in this provider's namespace
    fn scoped_names(&self) -> Vec<String> {
        let prefix = format!("{}{}", self.namespace, NAMESPACE_SEPARATOR);
        self.store
            .keys()
            .into_iter()
            .filter(|name| name.starts_with(&prefix))
            .collect()
    }
}

#[async_trait]
impl<S, P> StorageProvider for PreferenceStorageProvider<S, P>
where
    S: SerializationProvider,
    P: PreferenceStore,
{
    fn exists(&self, key: &str) -> bool {
        StorageKey::is_valid(key) && self.store.has_key(&self.scoped(key))
    }

    fn save<T: Serialize + Sync>(&self, key: &str, value: &T) -> Result<()> {
        StorageKey::validate(key)?;
        let bytes = self.serializer.serialize(value)?;
        self.write_payload(key, &bytes)
    }

    fn load<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        let bytes = self.read_payload(key)?;
        self.serializer.deserialize(&bytes)
    }

    fn load_shape(&self, key: &str, shape: &Shape) -> Result<Box<dyn Any + Send>> {
        let bytes = self.read_payload(key)?;
        self.serializer.deserialize_shape(&bytes, shape)
    }

    fn copy(&self, from_key: &str, to_key: &str) -> Result<()> {
        let from = self.checked_name(from_key)?;
        let to = self.checked_name(to_key)?;

        match self.store.get(&from) {
            Some(value) => {
                self.store.set(&to, value);
                debug!(from_key, to_key, "Copied preference value");
            }
            None => warn!(from_key, to_key, "Copy source does not exist, skipping"),
        }

        Ok(())
    }

    fn delete(&self, key: &str) -> Result<bool> {
        let name = self.checked_name(key)?;
        Ok(self.store.delete_key(&name))
    }

    fn delete_all(&self) -> Result<()> {
        let names = self.scoped_names();
        for name in &names {
            self.store.delete_key(name);
        }

        info!(namespace = %self.namespace, removed = names.len(), "Deleted all preference values");
        Ok(())
    }

    async fn exists_async(&self, key: &str) -> bool {
        self.exists(key)
    }

    async fn save_async<T: Serialize + Sync>(&self, key: &str, value: &T) -> Result<()> {
        StorageKey::validate(key)?;
        let bytes = self.serializer.serialize_async(value).await?;
        self.write_payload(key, &bytes)
    }

    async fn load_async<T: DeserializeOwned + Send>(&self, key: &str) -> Result<T> {
        let bytes = self.read_payload(key)?;
        self.serializer.deserialize_async(bytes).await
    }

    async fn load_shape_async(&self, key: &str, shape: &Shape) -> Result<Box<dyn Any + Send>> {
        let bytes = self.read_payload(key)?;
        self.serializer.deserialize_shape_async(bytes, shape).await
    }

    async fn copy_async(&self, from_key: &str, to_key: &str) -> Result<()> {
        self.copy(from_key, to_key)
    }

    async fn delete_async(&self, key: &str) -> Result<bool> {
        self.delete(key)
    }

    async fn delete_all_async(&self) -> Result<()> {
        self.delete_all()
    }
}

impl<S, P> Clone for PreferenceStorageProvider<S, P> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            serializer: Arc::clone(&self.serializer),
            namespace: self.namespace.clone(),
        }
    }
}

impl<S, P> fmt::Debug for PreferenceStorageProvider<S, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreferenceStorageProvider")
            .field("namespace", &self.namespace)
            .finish()
    }
}
