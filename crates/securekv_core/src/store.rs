//! Lazy, at-most-once initialization and legacy migration.

use crate::config::StorageConfig;
use crate::crypto::{CipherProvider, KeyFacility, KeyPurpose};
use crate::encrypted::EncryptedPreferences;
use crate::error::{StoreError, StoreResult};
use crate::migration::{MigrationReport, Migrator};
use crate::namespace::KeyPrefixCodec;
use parking_lot::{Mutex, RwLock};
use securekv_storage::{PreferencesBackend, PreferencesProvider};
use std::sync::Arc;

/// Observable lifecycle of a [`MigratingEncryptedStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreState {
    /// Nothing has been opened yet.
    Uninitialized,
    /// Some caller is opening the current backend and migrating.
    Initializing,
    /// The current backend is open. Terminal.
    Ready,
    /// Initialization failed after one reset. Terminal.
    Unavailable,
}

enum State {
    Uninitialized,
    Initializing,
    Ready(Arc<EncryptedPreferences>),
    Unavailable(String),
}

impl State {
    fn kind(&self) -> StoreState {
        match self {
            Self::Uninitialized => StoreState::Uninitialized,
            Self::Initializing => StoreState::Initializing,
            Self::Ready(_) => StoreState::Ready,
            Self::Unavailable(_) => StoreState::Unavailable,
        }
    }

    fn settled(&self) -> Option<StoreResult<Arc<EncryptedPreferences>>> {
        match self {
            Self::Ready(current) => Some(Ok(Arc::clone(current))),
            Self::Unavailable(reason) => Some(Err(StoreError::unavailable(reason.clone()))),
            Self::Uninitialized | Self::Initializing => None,
        }
    }
}

/// Owns the current backend and brings it to the fully migrated state.
///
/// The first call to [`ensure_ready`](Self::ensure_ready):
///
/// 1. opens the current backend, clearing it and retrying once on failure
/// 2. migrates every prefixed entry out of the legacy backend
///
/// Concurrent callers block until that finishes. Afterwards the state is
/// either `Ready` or `Unavailable` for the life of the object.
pub struct MigratingEncryptedStore {
    config: StorageConfig,
    codec: KeyPrefixCodec,
    provider: Arc<dyn PreferencesProvider>,
    keys: CipherProvider,
    state: RwLock<State>,
    init_lock: Mutex<()>,
    last_migration: Mutex<Option<MigrationReport>>,
}

impl MigratingEncryptedStore {
    /// Creates an uninitialized store. Nothing is opened until first use.
    pub fn new(
        config: StorageConfig,
        provider: Arc<dyn PreferencesProvider>,
        facility: Arc<dyn KeyFacility>,
    ) -> Self {
        let codec = KeyPrefixCodec::new(&config.key_prefix);
        Self {
            config,
            codec,
            provider,
            keys: CipherProvider::new(facility),
            state: RwLock::new(State::Uninitialized),
            init_lock: Mutex::new(()),
            last_migration: Mutex::new(None),
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    /// Returns the key namespacing codec.
    pub fn codec(&self) -> &KeyPrefixCodec {
        &self.codec
    }

    /// Returns the current lifecycle state.
    pub fn state(&self) -> StoreState {
        self.state.read().kind()
    }

    /// Returns the report of the migration pass run during initialization.
    pub fn last_migration(&self) -> Option<MigrationReport> {
        self.last_migration.lock().clone()
    }

    /// Returns the current backend, initializing on first call.
    ///
    /// # Errors
    ///
    /// The caller that runs a failed initialization receives
    /// [`StoreError::InitializationFailure`]; every later caller receives
    /// [`StoreError::StoreUnavailable`].
    pub fn ensure_ready(&self) -> StoreResult<Arc<EncryptedPreferences>> {
        if let Some(settled) = self.state.read().settled() {
            return settled;
        }

        let _init = self.init_lock.lock();
        if let Some(settled) = self.state.read().settled() {
            return settled;
        }

        *self.state.write() = State::Initializing;
        tracing::debug!(store = %self.config.store_name, "initializing secure store");

        match self.initialize() {
            Ok(current) => {
                *self.state.write() = State::Ready(Arc::clone(&current));
                tracing::info!(store = %self.config.store_name, "secure store ready");
                Ok(current)
            }
            Err(e) => {
                tracing::error!(
                    store = %self.config.store_name,
                    error = %e,
                    "secure store unavailable"
                );
                *self.state.write() = State::Unavailable(e.to_string());
                Err(e)
            }
        }
    }

    /// Removes `physical_key` from the legacy backend, if it is still there.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the removal fails.
    pub fn remove_legacy_entry(&self, physical_key: &str) -> StoreResult<()> {
        if let Some(legacy) = self.open_legacy() {
            legacy.remove(physical_key)?;
        }
        Ok(())
    }

    /// Removes every prefixed entry still present in the legacy backend.
    ///
    /// A legacy backend that cannot be opened is skipped with a warning.
    ///
    /// # Errors
    ///
    /// Returns a storage error if removing an entry fails.
    pub fn remove_legacy_entries(&self) -> StoreResult<usize> {
        let Some(legacy) = self.open_legacy() else {
            return Ok(0);
        };
        let owned: Vec<String> = legacy
            .all()?
            .into_keys()
            .filter(|k| self.codec.owns(k))
            .collect();
        for key in &owned {
            legacy.remove(key)?;
        }
        Ok(owned.len())
    }

    fn initialize(&self) -> StoreResult<Arc<EncryptedPreferences>> {
        let current = match self.open_current() {
            Ok(current) => current,
            Err(first) => {
                tracing::warn!(
                    store = %self.config.store_name,
                    error = %first,
                    "opening current store failed; clearing it and retrying once"
                );
                self.provider
                    .destroy(&self.config.store_name)
                    .map_err(|e| {
                        StoreError::initialization(format!("{first}; clearing store failed: {e}"))
                    })?;
                self.open_current()
                    .map_err(|e| StoreError::initialization(e.to_string()))?
            }
        };

        let current = Arc::new(current);
        let report = self.migrate(&current);
        *self.last_migration.lock() = Some(report);
        Ok(current)
    }

    fn open_current(&self) -> StoreResult<EncryptedPreferences> {
        let key = self.keys.master_key(KeyPurpose::Current)?;
        let raw = self.provider.open(&self.config.store_name)?;
        EncryptedPreferences::open(raw, key)
    }

    fn open_legacy(&self) -> Option<Arc<dyn PreferencesBackend>> {
        if self.config.legacy_store_name == self.config.store_name {
            tracing::debug!(
                store = %self.config.store_name,
                "legacy and current store share a name; no legacy backend"
            );
            return None;
        }
        match self.provider.open(&self.config.legacy_store_name) {
            Ok(legacy) => Some(legacy),
            Err(e) => {
                tracing::warn!(
                    store = %self.config.legacy_store_name,
                    error = %e,
                    "legacy store unreadable; skipping"
                );
                None
            }
        }
    }

    fn migrate(&self, current: &EncryptedPreferences) -> MigrationReport {
        let Some(legacy) = self.open_legacy() else {
            return MigrationReport::default();
        };
        match Migrator::new(legacy.as_ref(), current, &self.codec, &self.keys).run() {
            Ok(report) => report,
            Err(e) => {
                tracing::warn!(
                    store = %self.config.legacy_store_name,
                    error = %e,
                    "legacy migration aborted"
                );
                MigrationReport::default()
            }
        }
    }
}

impl std::fmt::Debug for MigratingEncryptedStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MigratingEncryptedStore")
            .field("config", &self.config)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::InMemoryKeyFacility;
    use securekv_storage::InMemoryProvider;

    fn store_with(
        provider: &Arc<InMemoryProvider>,
        facility: &Arc<InMemoryKeyFacility>,
    ) -> MigratingEncryptedStore {
        MigratingEncryptedStore::new(
            StorageConfig::default(),
            Arc::clone(provider) as Arc<dyn PreferencesProvider>,
            Arc::clone(facility) as Arc<dyn KeyFacility>,
        )
    }

    #[test]
    fn starts_uninitialized() {
        let store = store_with(
            &Arc::new(InMemoryProvider::new()),
            &Arc::new(InMemoryKeyFacility::new()),
        );
        assert_eq!(store.state(), StoreState::Uninitialized);
        assert!(store.last_migration().is_none());
    }

    #[test]
    fn ensure_ready_is_idempotent() {
        let store = store_with(
            &Arc::new(InMemoryProvider::new()),
            &Arc::new(InMemoryKeyFacility::new()),
        );
        let first = store.ensure_ready().unwrap();
        let second = store.ensure_ready().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(store.state(), StoreState::Ready);
        assert!(store.last_migration().unwrap().is_noop());
    }

    #[test]
    fn corrupted_store_is_cleared_and_retried() {
        let provider = Arc::new(InMemoryProvider::new());
        provider.store("SecureStorage").put("junk", "x").unwrap();
        provider.poison("SecureStorage");

        let store = store_with(&provider, &Arc::new(InMemoryKeyFacility::new()));
        store.ensure_ready().unwrap();

        assert_eq!(store.state(), StoreState::Ready);
        assert!(!provider.store("SecureStorage").contains("junk").unwrap());
    }

    #[test]
    fn key_failure_makes_store_unavailable() {
        let facility = Arc::new(InMemoryKeyFacility::new());
        facility.set_available(false);
        let store = store_with(&Arc::new(InMemoryProvider::new()), &facility);

        let err = store.ensure_ready().unwrap_err();
        assert!(matches!(err, StoreError::InitializationFailure { .. }));
        assert_eq!(store.state(), StoreState::Unavailable);

        facility.set_available(true);
        let err = store.ensure_ready().unwrap_err();
        assert!(matches!(err, StoreError::StoreUnavailable { .. }));
    }

    #[test]
    fn foreign_key_check_is_reset() {
        let provider = Arc::new(InMemoryProvider::new());
        store_with(&provider, &Arc::new(InMemoryKeyFacility::new()))
            .ensure_ready()
            .unwrap();

        // A fresh facility hands out a different key for the same alias.
        let store = store_with(&provider, &Arc::new(InMemoryKeyFacility::new()));
        store.ensure_ready().unwrap();
        assert_eq!(store.state(), StoreState::Ready);
    }

    #[test]
    fn shared_store_name_skips_legacy() {
        let provider = Arc::new(InMemoryProvider::new());
        let store = MigratingEncryptedStore::new(
            StorageConfig::new().legacy_store_name("SecureStorage"),
            Arc::clone(&provider) as Arc<dyn PreferencesProvider>,
            Arc::new(InMemoryKeyFacility::new()),
        );
        store.ensure_ready().unwrap();
        assert_eq!(store.remove_legacy_entries().unwrap(), 0);
    }

    #[test]
    fn remove_legacy_entries_respects_prefix() {
        let provider = Arc::new(InMemoryProvider::new());
        let store = store_with(&provider, &Arc::new(InMemoryKeyFacility::new()));
        let legacy = provider.store("SecureStorage.v1");
        legacy.put(&store.codec().encode("a"), "x").unwrap();
        legacy.put("other_b", "y").unwrap();

        assert_eq!(store.remove_legacy_entries().unwrap(), 1);
        assert!(legacy.contains("other_b").unwrap());
    }

    #[test]
    fn remove_legacy_entry_removes_only_that_key() {
        let provider = Arc::new(InMemoryProvider::new());
        let store = store_with(&provider, &Arc::new(InMemoryKeyFacility::new()));
        let legacy = provider.store("SecureStorage.v1");
        legacy.put(&store.codec().encode("a"), "x").unwrap();
        legacy.put(&store.codec().encode("b"), "y").unwrap();

        store.remove_legacy_entry(&store.codec().encode("a")).unwrap();
        store.remove_legacy_entry(&store.codec().encode("missing")).unwrap();
        assert!(!legacy.contains(&store.codec().encode("a")).unwrap());
        assert!(legacy.contains(&store.codec().encode("b")).unwrap());
    }
}
