//! In-memory preferences backend for testing.

use crate::backend::{PreferencesBackend, PreferencesProvider};
use crate::error::{StorageError, StorageResult};
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

/// An in-memory preferences store.
///
/// Suitable for:
/// - Unit tests
/// - Integration tests
/// - Ephemeral stores that don't need persistence
///
/// # Example
///
/// ```rust
/// use securekv_storage::{InMemoryPreferences, PreferencesBackend};
///
/// let prefs = InMemoryPreferences::new("demo");
/// prefs.put("token", "abc").unwrap();
/// assert_eq!(prefs.get("token").unwrap().as_deref(), Some("abc"));
/// ```
#[derive(Debug, Default)]
pub struct InMemoryPreferences {
    name: String,
    entries: RwLock<BTreeMap<String, String>>,
}

impl InMemoryPreferences {
    /// Creates a new empty store.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: RwLock::new(BTreeMap::new()),
        }
    }

    /// Creates a store with pre-existing entries.
    ///
    /// Useful for seeding legacy data in tests.
    #[must_use]
    pub fn with_entries(name: impl Into<String>, entries: BTreeMap<String, String>) -> Self {
        Self {
            name: name.into(),
            entries: RwLock::new(entries),
        }
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns `true` if the store holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl PreferencesBackend for InMemoryPreferences {
    fn name(&self) -> &str {
        &self.name
    }

    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn put(&self, key: &str, value: &str) -> StorageResult<()> {
        self.entries
            .write()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        self.entries.write().remove(key);
        Ok(())
    }

    fn clear(&self) -> StorageResult<()> {
        self.entries.write().clear();
        Ok(())
    }

    fn all(&self) -> StorageResult<BTreeMap<String, String>> {
        Ok(self.entries.read().clone())
    }

    fn contains(&self, key: &str) -> StorageResult<bool> {
        Ok(self.entries.read().contains_key(key))
    }
}

/// Hands out shared [`InMemoryPreferences`] stores by name.
///
/// A store can be marked corrupted with [`poison`](Self::poison) to simulate
/// unreadable persisted state; `open` then fails until the store is destroyed.
#[derive(Debug, Default)]
pub struct InMemoryProvider {
    stores: Mutex<HashMap<String, Arc<InMemoryPreferences>>>,
    poisoned: Mutex<HashSet<String>>,
}

impl InMemoryProvider {
    /// Creates a provider with no stores.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the concrete store for `name`, creating it if missing.
    ///
    /// Unlike [`open`](PreferencesProvider::open) this ignores poisoning, so
    /// tests can inspect and tamper with raw state.
    pub fn store(&self, name: &str) -> Arc<InMemoryPreferences> {
        let mut stores = self.stores.lock();
        Arc::clone(
            stores
                .entry(name.to_string())
                .or_insert_with(|| Arc::new(InMemoryPreferences::new(name))),
        )
    }

    /// Marks the named store as corrupted until it is destroyed.
    pub fn poison(&self, name: &str) {
        self.poisoned.lock().insert(name.to_string());
    }
}

impl PreferencesProvider for InMemoryProvider {
    fn open(&self, name: &str) -> StorageResult<Arc<dyn PreferencesBackend>> {
        if self.poisoned.lock().contains(name) {
            return Err(StorageError::corrupted(name, "store marked corrupted"));
        }
        Ok(self.store(name))
    }

    fn destroy(&self, name: &str) -> StorageResult<()> {
        self.poisoned.lock().remove(name);
        if let Some(store) = self.stores.lock().get(name) {
            store.clear()?;
        }
        Ok(())
    }
}
