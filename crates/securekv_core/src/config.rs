//! Store configuration.

use std::collections::BTreeMap;

/// Physical store used when no name is configured.
pub const DEFAULT_STORE_NAME: &str = "SecureStorage";

/// Physical store where installations using the v1 scheme wrote their data.
pub const DEFAULT_LEGACY_STORE_NAME: &str = "SecureStorage.v1";

/// Namespacing prefix used when none is configured.
pub const DEFAULT_KEY_PREFIX: &str = "VGhpcyBpcyB0aGUgcHJlZml4IGZvciBhIHNlY3VyZSBzdG9yYWdlCg";

/// Option name selecting the physical store.
pub const OPTION_STORE_NAME: &str = "sharedPreferencesName";

/// Option name selecting the namespacing prefix.
pub const OPTION_KEY_PREFIX: &str = "preferencesKeyPrefix";

/// Option name enabling reset-on-error.
pub const OPTION_RESET_ON_ERROR: &str = "resetOnError";

/// Configuration for a secure store.
///
/// Supplied once at construction; the store never mutates it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StorageConfig {
    /// Physical store holding current-scheme entries.
    pub store_name: String,

    /// Physical store that may still hold entries written by the v1 scheme.
    pub legacy_store_name: String,

    /// Namespacing prefix for this logical store.
    pub key_prefix: String,

    /// Wipe this logical store and report success instead of failing.
    pub reset_on_error: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            store_name: DEFAULT_STORE_NAME.to_string(),
            legacy_store_name: DEFAULT_LEGACY_STORE_NAME.to_string(),
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            reset_on_error: false,
        }
    }
}

impl StorageConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a configuration from a host option bundle.
    ///
    /// Recognizes [`OPTION_STORE_NAME`], [`OPTION_KEY_PREFIX`] and
    /// [`OPTION_RESET_ON_ERROR`]; other options are ignored. Reset-on-error
    /// is enabled only by the exact string `"true"`.
    #[must_use]
    pub fn from_options(options: &BTreeMap<String, String>) -> Self {
        let mut config = Self::default();
        if let Some(name) = options.get(OPTION_STORE_NAME) {
            config.store_name.clone_from(name);
        }
        if let Some(prefix) = options.get(OPTION_KEY_PREFIX) {
            config.key_prefix.clone_from(prefix);
        }
        config.reset_on_error = options
            .get(OPTION_RESET_ON_ERROR)
            .is_some_and(|v| v == "true");
        config
    }

    /// Sets the physical store name.
    #[must_use]
    pub fn store_name(mut self, name: impl Into<String>) -> Self {
        self.store_name = name.into();
        self
    }

    /// Sets the legacy physical store name.
    #[must_use]
    pub fn legacy_store_name(mut self, name: impl Into<String>) -> Self {
        self.legacy_store_name = name.into();
        self
    }

    /// Sets the namespacing prefix.
    #[must_use]
    pub fn key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    /// Sets whether failures wipe the store instead of propagating.
    #[must_use]
    pub const fn reset_on_error(mut self, value: bool) -> Self {
        self.reset_on_error = value;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = StorageConfig::default();
        assert_eq!(config.store_name, DEFAULT_STORE_NAME);
        assert_eq!(config.key_prefix, DEFAULT_KEY_PREFIX);
        assert!(!config.reset_on_error);
    }

    #[test]
    fn builder_pattern() {
        let config = StorageConfig::new()
            .store_name("prefs")
            .key_prefix("app")
            .reset_on_error(true);

        assert_eq!(config.store_name, "prefs");
        assert_eq!(config.key_prefix, "app");
        assert!(config.reset_on_error);
    }

    #[test]
    fn from_options_reads_known_keys() {
        let mut options = BTreeMap::new();
        options.insert(OPTION_STORE_NAME.to_string(), "custom".to_string());
        options.insert(OPTION_KEY_PREFIX.to_string(), "p".to_string());
        options.insert(OPTION_RESET_ON_ERROR.to_string(), "true".to_string());
        options.insert("accessibility".to_string(), "unlocked".to_string());

        let config = StorageConfig::from_options(&options);
        assert_eq!(config.store_name, "custom");
        assert_eq!(config.key_prefix, "p");
        assert!(config.reset_on_error);
        assert_eq!(config.legacy_store_name, DEFAULT_LEGACY_STORE_NAME);
    }

    #[test]
    fn reset_on_error_requires_exact_true() {
        let mut options = BTreeMap::new();
        options.insert(OPTION_RESET_ON_ERROR.to_string(), "TRUE".to_string());
        assert!(!StorageConfig::from_options(&options).reset_on_error);
    }
}
