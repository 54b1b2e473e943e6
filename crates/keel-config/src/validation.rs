//! Configuration validation.
//!
//! Schema validation is pure and runs everywhere; filesystem validation
//! touches disk and is for CLI use, after discovery.

use std::path::Path;

use crate::config::KeelConfig;
use crate::error::{ConfigError, Result};

/// Validate the schema-level invariants of a configuration.
pub fn validate_schema(config: &KeelConfig) -> Result<()> {
    if config.entries.is_empty() {
        return Err(ConfigError::NoEntries);
    }

    for entry in &config.entries {
        if entry.path.as_os_str().is_empty() {
            return Err(ConfigError::SchemaValidation(
                "entry path is empty".to_string(),
            ));
        }
    }

    if let Some(0) = config.chunking.max_chunk_size {
        return Err(ConfigError::InvalidValue(
            "chunking.max_chunk_size must be greater than zero".to_string(),
        ));
    }

    for (name, transition) in &config.transitions {
        if name.is_empty() {
            return Err(ConfigError::SchemaValidation(
                "transition name is empty".to_string(),
            ));
        }
        for (from, to) in &transition.aliases {
            if from.is_empty() || to.is_empty() {
                return Err(ConfigError::SchemaValidation(format!(
                    "transition \"{name}\" has an empty alias mapping"
                )));
            }
        }
    }

    for (from, to) in &config.resolve.aliases {
        if from.is_empty() || to.is_empty() {
            return Err(ConfigError::SchemaValidation(
                "resolve.aliases has an empty mapping".to_string(),
            ));
        }
    }

    Ok(())
}

/// Validate filesystem expectations relative to a project root.
pub fn validate_fs(config: &KeelConfig, root: &Path) -> Result<()> {
    for entry in &config.entries {
        let path = root.join(&entry.path);
        if !path.exists() {
            return Err(ConfigError::EntryNotFound(path));
        }
    }
    Ok(())
}
