//! Storage keys
//!
//! A key names one saved unit and maps to exactly one backing entry. Keys
//! are used verbatim as file names, so anything that would let two keys
//! resolve to the same path, or escape the storage root, is rejected.

use std::fmt;
use std::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Characters that can never appear in a key
const FORBIDDEN_CHARS: [char; 3] = ['/', '\\', '\0'];

/// A validated, non-empty storage key
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StorageKey(String);

impl StorageKey {
    /// Parses and validates a key
    ///
    /// # Examples
    ///
    /// ```
    /// use savekit_common::StorageKey;
    ///
    /// assert!(StorageKey::parse("player1").is_ok());
    /// assert!(StorageKey::parse("saves/player1").is_err());
    /// assert!(StorageKey::parse("").is_err());
    /// ```
    pub fn parse(key: &str) -> Result<Self> {
        Self::validate(key)?;
        Ok(Self(key.to_string()))
    }

    /// Checks a key without allocating
    pub fn validate(key: &str) -> Result<()> {
        if key.is_empty() {
            return Err(Error::InvalidKey("key must not be empty".to_string()));
        }

        if key == "." || key == ".." {
            return Err(Error::InvalidKey(format!("'{}' is reserved", key)));
        }

        if let Some(c) = key.chars().find(|c| FORBIDDEN_CHARS.contains(c)) {
            return Err(Error::InvalidKey(format!(
                "'{}' contains forbidden character {:?}",
                key.escape_debug(),
                c
            )));
        }

        Ok(())
    }

    /// Returns true if the key would be accepted by [`StorageKey::parse`]
    pub fn is_valid(key: &str) -> bool {
        Self::validate(key).is_ok()
    }

    /// Returns the key as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for StorageKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for StorageKey {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::validate(&value)?;
        Ok(Self(value))
    }
}

impl From<StorageKey> for String {
    fn from(key: StorageKey) -> Self {
        key.0
    }
}

impl AsRef<str> for StorageKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
