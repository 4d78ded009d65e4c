//! Preference-backed persistence

pub mod provider;
pub mod store;

pub use provider::PreferenceStorageProvider;
pub use store::{FilePreferenceStore, MemoryPreferenceStore, PreferenceStore, PreferenceValue};
