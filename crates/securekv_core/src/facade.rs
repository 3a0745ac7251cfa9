//! The public CRUD surface.

use crate::config::StorageConfig;
use crate::crypto::{InMemoryKeyFacility, KeyFacility};
use crate::encrypted::EncryptedPreferences;
use crate::error::StoreResult;
use crate::migration::MigrationReport;
use crate::store::{MigratingEncryptedStore, StoreState};
use securekv_storage::{InMemoryProvider, PreferencesProvider};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Result of a successful façade call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    /// The operation completed normally.
    Value(T),
    /// The operation failed and reset-on-error wiped this logical store.
    Reset,
}

impl<T> Outcome<T> {
    /// Returns the value, or `None` after a reset.
    pub fn value(self) -> Option<T> {
        match self {
            Self::Value(v) => Some(v),
            Self::Reset => None,
        }
    }

    /// Returns `true` if this is the reset indicator.
    pub fn is_reset(&self) -> bool {
        matches!(self, Self::Reset)
    }

    /// Maps the contained value.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Self::Value(v) => Outcome::Value(f(v)),
            Self::Reset => Outcome::Reset,
        }
    }
}

/// An encrypted, namespaced key-value store.
///
/// Every operation first initializes the store (once, blocking concurrent
/// callers), migrating legacy entries on the way. Initialization failures
/// are never converted by reset-on-error.
///
/// Cloning is cheap and the clones share one engine. Views created with
/// [`with_reset_on_error`](Self::with_reset_on_error) also share it and
/// differ only in how failed operations are handled.
///
/// # Example
///
/// ```rust
/// use securekv_core::{SecureStore, StorageConfig};
///
/// let store = SecureStore::in_memory(StorageConfig::default());
/// store.write("token", "abc123").unwrap();
/// let value = store.read("token").unwrap().value().flatten();
/// assert_eq!(value.as_deref(), Some("abc123"));
/// ```
#[derive(Debug, Clone)]
pub struct SecureStore {
    inner: Arc<MigratingEncryptedStore>,
    config: StorageConfig,
}

impl SecureStore {
    /// Creates a store over `provider`, taking master keys from `facility`.
    pub fn new(
        config: StorageConfig,
        provider: Arc<dyn PreferencesProvider>,
        facility: Arc<dyn KeyFacility>,
    ) -> Self {
        Self {
            inner: Arc::new(MigratingEncryptedStore::new(config.clone(), provider, facility)),
            config,
        }
    }

    /// Returns a view over the same engine with `reset_on_error` replaced.
    #[must_use]
    pub fn with_reset_on_error(&self, reset_on_error: bool) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            config: self.config.clone().reset_on_error(reset_on_error),
        }
    }

    /// Returns `true` if both handles drive the same engine.
    pub fn shares_engine_with(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Creates an ephemeral store with in-memory storage and keys.
    pub fn in_memory(config: StorageConfig) -> Self {
        Self::new(
            config,
            Arc::new(InMemoryProvider::new()),
            Arc::new(InMemoryKeyFacility::new()),
        )
    }

    /// Forces initialization.
    ///
    /// # Errors
    ///
    /// Returns the initialization failure, or `StoreUnavailable` after one.
    pub fn initialize(&self) -> StoreResult<()> {
        self.inner.ensure_ready().map(|_| ())
    }

    /// Returns the configuration of this view.
    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    /// Returns the lifecycle state.
    pub fn state(&self) -> StoreState {
        self.inner.state()
    }

    /// Returns the report of the initialization migration pass, if run.
    pub fn last_migration(&self) -> Option<MigrationReport> {
        self.inner.last_migration()
    }

    /// Encrypts and stores `value` under `key`, overwriting any value.
    pub fn write(&self, key: &str, value: &str) -> StoreResult<Outcome<()>> {
        self.guarded("write", |current| {
            current.put(&self.inner.codec().encode(key), value)
        })
    }

    /// Reads and decrypts the value under `key`.
    ///
    /// A value that fails to decrypt is an error, not `None`.
    pub fn read(&self, key: &str) -> StoreResult<Outcome<Option<String>>> {
        self.guarded("read", |current| current.get(&self.inner.codec().encode(key)))
    }

    /// Returns `true` if `key` has a value. Nothing is decrypted.
    pub fn contains_key(&self, key: &str) -> StoreResult<Outcome<bool>> {
        self.guarded("containsKey", |current| {
            current.contains(&self.inner.codec().encode(key))
        })
    }

    /// Removes `key` from the current backend and any unmigrated copy from
    /// the legacy backend. Absent keys are not an error.
    pub fn delete(&self, key: &str) -> StoreResult<Outcome<()>> {
        self.guarded("delete", |current| {
            let physical = self.inner.codec().encode(key);
            current.remove(&physical)?;
            self.inner.remove_legacy_entry(&physical)
        })
    }

    /// Removes every entry of this logical store from the current backend
    /// and from the legacy backend. Other prefixes are untouched.
    pub fn delete_all(&self) -> StoreResult<Outcome<()>> {
        self.guarded("deleteAll", |current| self.wipe(current))
    }

    /// Decrypts every entry of this logical store.
    ///
    /// Entries that fail to decrypt are logged and left out of the result.
    pub fn read_all(&self) -> StoreResult<Outcome<BTreeMap<String, String>>> {
        self.guarded("readAll", |current| {
            let codec = self.inner.codec();
            let mut values = BTreeMap::new();
            for (physical, text) in current.sealed_entries(codec)? {
                let Some(logical) = codec.decode(&physical) else {
                    continue;
                };
                match current.decrypt_value(&physical, &text) {
                    Ok(value) => {
                        values.insert(logical.to_string(), value);
                    }
                    Err(e) => {
                        tracing::warn!(key = %physical, error = %e, "dropping undecryptable entry");
                    }
                }
            }
            Ok(values)
        })
    }

    fn wipe(&self, current: &EncryptedPreferences) -> StoreResult<()> {
        let current_removed = current.remove_owned(self.inner.codec())?;
        let legacy_removed = self.inner.remove_legacy_entries()?;
        tracing::debug!(
            prefix = %self.config().key_prefix,
            current = current_removed,
            legacy = legacy_removed,
            "logical store wiped"
        );
        Ok(())
    }

    fn guarded<T>(
        &self,
        operation: &'static str,
        f: impl FnOnce(&EncryptedPreferences) -> StoreResult<T>,
    ) -> StoreResult<Outcome<T>> {
        let current = self.inner.ensure_ready()?;
        let err = match f(current.as_ref()) {
            Ok(value) => return Ok(Outcome::Value(value)),
            Err(e) => e,
        };

        if !self.config.reset_on_error || err.is_terminal() {
            return Err(err);
        }

        tracing::warn!(operation, error = %err, "operation failed; resetting store");
        match self.wipe(&current) {
            Ok(()) => Ok(Outcome::Reset),
            Err(wipe_err) => {
                tracing::error!(operation, error = %wipe_err, "reset failed");
                Err(err)
            }
        }
    }
}
