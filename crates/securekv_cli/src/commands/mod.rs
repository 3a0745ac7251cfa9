//! CLI command implementations.

pub mod migrate;
pub mod store;

use clap::ValueEnum;
use securekv_core::crypto::DerivedKeyFacility;
use securekv_core::{SecureStore, StorageConfig};
use securekv_storage::FileProvider;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

/// CLI-level errors.
#[derive(Debug, Error)]
pub enum CliError {
    /// No device secret was supplied.
    #[error("device secret required: pass --secret or set SECUREKV_DEVICE_SECRET")]
    MissingSecret,

    /// The device secret is empty.
    #[error("device secret must not be empty")]
    EmptySecret,
}

/// Output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    /// Human-readable text
    Text,
    /// JSON
    Json,
}

/// Store selection from the global flags.
#[derive(Debug)]
pub struct StoreOptions {
    /// Directory holding the store files.
    pub dir: PathBuf,
    /// Physical store name override.
    pub store_name: Option<String>,
    /// Legacy store name override.
    pub legacy_store_name: Option<String>,
    /// Key prefix override.
    pub key_prefix: Option<String>,
    /// Reset-on-error flag.
    pub reset_on_error: bool,
    /// Device secret.
    pub secret: Option<String>,
}

impl StoreOptions {
    /// Builds the store configuration.
    pub fn config(&self) -> StorageConfig {
        let mut config = StorageConfig::new().reset_on_error(self.reset_on_error);
        if let Some(name) = &self.store_name {
            config = config.store_name(name.as_str());
        }
        if let Some(name) = &self.legacy_store_name {
            config = config.legacy_store_name(name.as_str());
        }
        if let Some(prefix) = &self.key_prefix {
            config = config.key_prefix(prefix.as_str());
        }
        config
    }

    /// Opens the file-backed store. Nothing is read until the first command.
    pub fn open(&self) -> Result<SecureStore, CliError> {
        let secret = self.secret.as_deref().ok_or(CliError::MissingSecret)?;
        if secret.is_empty() {
            return Err(CliError::EmptySecret);
        }
        tracing::debug!(dir = %self.dir.display(), "opening secure store");
        Ok(SecureStore::new(
            self.config(),
            Arc::new(FileProvider::new(&self.dir)),
            Arc::new(DerivedKeyFacility::new(secret.as_bytes())),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> StoreOptions {
        StoreOptions {
            dir: PathBuf::from("."),
            store_name: None,
            legacy_store_name: None,
            key_prefix: Some("cli".to_string()),
            reset_on_error: true,
            secret: None,
        }
    }

    #[test]
    fn overrides_apply() {
        let config = options().config();
        assert_eq!(config.key_prefix, "cli");
        assert!(config.reset_on_error);
        assert_eq!(config.store_name, securekv_core::DEFAULT_STORE_NAME);
    }

    #[test]
    fn secret_is_required() {
        assert!(matches!(options().open(), Err(CliError::MissingSecret)));

        let mut empty = options();
        empty.secret = Some(String::new());
        assert!(matches!(empty.open(), Err(CliError::EmptySecret)));
    }
}
