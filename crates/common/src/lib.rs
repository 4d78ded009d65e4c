//! Common utilities and types for SaveKit
//!
//! This crate provides shared functionality used across the SaveKit crates,
//! including the error type, storage key validation, and utility functions.

pub mod error;
pub mod key;
pub mod utils;

// Re-export commonly used types
pub use error::{Error, Result};
pub use key::StorageKey;
