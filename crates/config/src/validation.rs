//! Configuration validation

use std::path::{Component, Path};

use savekit_common::{Error, Result};

use crate::schema::SaveKitConfig;

/// Validates a loaded configuration
pub fn validate(config: &SaveKitConfig) -> Result<()> {
    if config.storage.app_name.trim().is_empty() {
        return Err(Error::Configuration("storage.app_name must not be empty".to_string()));
    }

    if let Some(path) = config.storage.path.as_deref() {
        validate_segment(path)?;
    }

    if config.preferences.namespace.is_empty() {
        return Err(Error::Configuration(
            "preferences.namespace must not be empty".to_string(),
        ));
    }

    Ok(())
}

/// A storage path segment must stay below the base directory
fn validate_segment(segment: &str) -> Result<()> {
    for component in Path::new(segment).components() {
        match component {
            Component::Normal(_) | Component::CurDir => {}
            _ => {
                return Err(Error::Configuration(format!(
                    "storage.path '{}' must be relative to the data directory",
                    segment
                )));
            }
        }
    }

    Ok(())
}
