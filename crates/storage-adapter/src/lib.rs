//! Storage providers for SaveKit
//!
//! This crate provides the key-based [`StorageProvider`] contract and its
//! implementations: a file-backed provider keeping one file per key under a
//! root directory, and a preference-backed provider over a platform
//! key-value store. Values are encoded by a shared [`SerializationProvider`].

pub mod filesystem;
pub mod preferences;
pub mod provider;
pub mod serialization;

// Re-export commonly used types
pub use filesystem::FileStorageProvider;
pub use preferences::{
    FilePreferenceStore, MemoryPreferenceStore, PreferenceStorageProvider, PreferenceStore,
    PreferenceValue,
};
pub use provider::StorageProvider;
pub use serialization::{JsonSerializationProvider, SerializationProvider, Shape};
