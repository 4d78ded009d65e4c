//! The storage provider contract
//!
//! Every provider exposes the same key-based operations in a blocking form
//! and an `*_async` form. Both forms have identical postconditions; they
//! differ only in whether the calling thread blocks or the calling task
//! suspends at the I/O boundary.
//!
//! Providers enforce no ordering or mutual exclusion between concurrent
//! operations on the same key. Concurrent writers to one key may clobber
//! each other; callers that need per-key serialization must impose it.

use std::any::Any;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use savekit_common::Result;

use crate::serialization::Shape;

/// Key-based persistence of serialized values
#[async_trait]
pub trait StorageProvider: Send + Sync {
    /// Returns true iff a value is currently stored under `key`
    ///
    /// Never fails: invalid keys and unreadable entries report `false`.
    fn exists(&self, key: &str) -> bool;

    /// Persists `value` under `key`, replacing any previous value
    fn save<T: Serialize + Sync>(&self, key: &str, value: &T) -> Result<()>;

    /// Loads the most recently saved value for `key`
    ///
    /// Fails with `NotFound` when nothing is stored under `key` and with
    /// `Deserialization` when the stored payload does not decode as `T`.
    fn load<T: DeserializeOwned>(&self, key: &str) -> Result<T>;

    /// Loads the value for `key` as the runtime-selected `shape`
    fn load_shape(&self, key: &str, shape: &Shape) -> Result<Box<dyn Any + Send>>;

    /// Duplicates the payload at `from_key` to `to_key`
    ///
    /// A missing source is a silent no-op. Callers that need to fail on a
    /// missing source must check [`StorageProvider::exists`] first.
    fn copy(&self, from_key: &str, to_key: &str) -> Result<()>;

    /// Removes the value for `key`, returning whether one was removed
    fn delete(&self, key: &str) -> Result<bool>;

    /// Removes every value stored by this provider instance
    fn delete_all(&self) -> Result<()>;

    /// Async form of [`StorageProvider::exists`]
    async fn exists_async(&self, key: &str) -> bool;

    /// Async form of [`StorageProvider::save`]
    async fn save_async<T: Serialize + Sync>(&self, key: &str, value: &T) -> Result<()>;

    /// Async form of [`StorageProvider::load`]
    async fn load_async<T: DeserializeOwned + Send>(&self, key: &str) -> Result<T>;

    /// Async form of [`StorageProvider::load_shape`]
    async fn load_shape_async(&self, key: &str, shape: &Shape) -> Result<Box<dyn Any + Send>>;

    /// Async form of [`StorageProvider::copy`]
    async fn copy_async(&self, from_key: &str, to_key: &str) -> Result<()>;

    /// Async form of [`StorageProvider::delete`]
    async fn delete_async(&self, key: &str) -> Result<bool>;

    /// Async form of [`StorageProvider::delete_all`]
    async fn delete_all_async(&self) -> Result<()>;
}
