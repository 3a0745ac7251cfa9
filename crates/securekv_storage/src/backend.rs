//! Preferences backend trait definitions.

use crate::error::StorageResult;
use std::collections::BTreeMap;
use std::sync::Arc;

/// A persisted, string-keyed preferences store.
///
/// Backends are **opaque ordered maps** from `String` to `String`. They know
/// nothing about namespacing prefixes, ciphers or envelopes; every value the
/// secure store writes is already encrypted by the time it reaches this layer.
///
/// # Invariants
///
/// - `put` followed by `get` on the same key returns the written value
/// - `remove` of a missing key is not an error
/// - `all` returns entries in ascending key order
/// - There are no transactional guarantees across multiple keys
pub trait PreferencesBackend: Send + Sync {
    /// Returns the physical store name this backend was opened under.
    fn name(&self) -> &str;

    /// Reads the value stored under `key`.
    ///
    /// Returns `Ok(None)` if the key does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying store cannot be read.
    fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// Stores `value` under `key`, overwriting any existing value.
    ///
    /// # Errors
    ///
    /// Returns an error if the write cannot be persisted.
    fn put(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Removes `key`. Removing a missing key succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if the removal cannot be persisted.
    fn remove(&self, key: &str) -> StorageResult<()>;

    /// Removes every entry in the store.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be persisted.
    fn clear(&self) -> StorageResult<()>;

    /// Returns a snapshot of every entry, ordered by key.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying store cannot be read.
    fn all(&self) -> StorageResult<BTreeMap<String, String>>;

    /// Checks whether `key` exists.
    ///
    /// The default implementation calls [`get`](PreferencesBackend::get).
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying store cannot be read.
    fn contains(&self, key: &str) -> StorageResult<bool> {
        Ok(self.get(key)?.is_some())
    }
}

/// Opens named physical preferences stores.
///
/// Several logical stores may share one physical store; a provider must hand
/// out the same underlying state for repeated opens of the same name.
pub trait PreferencesProvider: Send + Sync {
    /// Opens (creating if missing) the physical store called `name`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Corrupted`](crate::StorageError::Corrupted) if
    /// the persisted state exists but cannot be read.
    fn open(&self, name: &str) -> StorageResult<Arc<dyn PreferencesBackend>>;

    /// Wipes the physical store called `name`, even if its persisted state
    /// is unreadable. Handles opened earlier observe an empty store.
    ///
    /// # Errors
    ///
    /// Returns an error if the persisted state cannot be removed.
    fn destroy(&self, name: &str) -> StorageResult<()>;
}
