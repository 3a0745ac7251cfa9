//! Test fixtures and store helpers.
//!
//! A [`TestStore`] owns the storage and the key facility, so several
//! [`SecureStore`] instances built from it behave like successive launches
//! of the same application on one device.

use securekv_core::crypto::{
    CipherMetadata, CipherProvider, DerivedKeyFacility, Envelope, InMemoryKeyFacility,
    KeyFacility, KeyPurpose, LegacyCipherV1, StorageCipher,
};
use securekv_core::{KeyPrefixCodec, SecureStore, StorageConfig};
use securekv_storage::{
    FileProvider, InMemoryPreferences, InMemoryProvider, PreferencesBackend, PreferencesProvider,
};
use std::sync::Arc;
use tempfile::TempDir;

/// Shared storage and keys for building stores in tests.
pub struct TestStore {
    /// The raw storage provider.
    pub provider: Arc<InMemoryProvider>,
    /// The key facility.
    pub facility: Arc<InMemoryKeyFacility>,
    /// Configuration used by [`store`](Self::store).
    pub config: StorageConfig,
}

impl Default for TestStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TestStore {
    /// Creates a fixture with the default configuration.
    pub fn new() -> Self {
        Self::with_config(StorageConfig::default())
    }

    /// Creates a fixture with `config`.
    pub fn with_config(config: StorageConfig) -> Self {
        Self {
            provider: Arc::new(InMemoryProvider::new()),
            facility: Arc::new(InMemoryKeyFacility::new()),
            config,
        }
    }

    /// Builds a fresh, uninitialized store over the shared state.
    pub fn store(&self) -> SecureStore {
        self.store_with(self.config.clone())
    }

    /// Builds a store with a different configuration over the shared state.
    pub fn store_with(&self, config: StorageConfig) -> SecureStore {
        SecureStore::new(
            config,
            Arc::clone(&self.provider) as Arc<dyn PreferencesProvider>,
            Arc::clone(&self.facility) as Arc<dyn KeyFacility>,
        )
    }

    /// Returns the raw current backend.
    pub fn raw_current(&self) -> Arc<InMemoryPreferences> {
        self.provider.store(&self.config.store_name)
    }

    /// Returns the raw legacy backend.
    pub fn raw_legacy(&self) -> Arc<InMemoryPreferences> {
        self.provider.store(&self.config.legacy_store_name)
    }

    /// Returns the physical key for `logical` under this fixture's prefix.
    pub fn physical_key(&self, logical: &str) -> String {
        KeyPrefixCodec::new(&self.config.key_prefix).encode(logical)
    }

    /// Writes `value` into the legacy backend the way the v1 scheme did.
    pub fn seed_legacy_entry(&self, logical: &str, value: &str) {
        let key = CipherProvider::new(Arc::clone(&self.facility) as Arc<dyn KeyFacility>)
            .master_key(KeyPurpose::Legacy)
            .expect("legacy key");
        let blob = LegacyCipherV1
            .encrypt(value.as_bytes(), &key)
            .expect("legacy encrypt");
        let text = Envelope::new(LegacyCipherV1.metadata(), blob)
            .to_text()
            .expect("encode envelope");
        self.raw_legacy()
            .put(&self.physical_key(logical), &text)
            .expect("seed legacy entry");
    }

    /// Writes a v1 entry whose blob is not a whole number of blocks.
    pub fn seed_corrupt_legacy_entry(&self, logical: &str) {
        let text = Envelope::new(LegacyCipherV1.metadata(), vec![0x5a; 21])
            .to_text()
            .expect("encode envelope");
        self.raw_legacy()
            .put(&self.physical_key(logical), &text)
            .expect("seed legacy entry");
    }

    /// Writes a legacy entry tagged with a scheme version nobody knows.
    pub fn seed_unknown_version_entry(&self, logical: &str, version: u16) {
        let metadata = CipherMetadata {
            scheme_version: version,
            algorithm_parameters: b"ROT13".to_vec(),
        };
        let text = Envelope::new(metadata, vec![0; 32])
            .to_text()
            .expect("encode envelope");
        self.raw_legacy()
            .put(&self.physical_key(logical), &text)
            .expect("seed legacy entry");
    }

    /// Flips one ciphertext bit of a value in the current backend.
    ///
    /// # Panics
    ///
    /// Panics if `logical` has no stored value.
    pub fn corrupt_current_entry(&self, logical: &str) {
        let raw = self.raw_current();
        let physical = self.physical_key(logical);
        let text = raw
            .get(&physical)
            .expect("read raw")
            .expect("entry to corrupt");
        let mut envelope = Envelope::from_text(&text).expect("decode envelope");
        let last = envelope.blob.len() - 1;
        envelope.blob[last] ^= 0x01;
        raw.put(&physical, &envelope.to_text().expect("encode envelope"))
            .expect("write corrupted entry");
    }
}

/// A file-backed store in a temporary directory.
pub struct FileTestStore {
    /// The temporary directory (kept alive to prevent cleanup).
    pub dir: TempDir,
    /// Device secret for the derived key facility.
    pub secret: Vec<u8>,
    /// Configuration used by [`store`](Self::store).
    pub config: StorageConfig,
}

impl FileTestStore {
    /// Creates an empty directory and a fixed device secret.
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp directory"),
            secret: b"test device secret".to_vec(),
            config: StorageConfig::default(),
        }
    }

    /// Builds a store as a fresh process would: new provider, new facility.
    pub fn store(&self) -> SecureStore {
        SecureStore::new(
            self.config.clone(),
            Arc::new(FileProvider::new(self.dir.path())),
            Arc::new(DerivedKeyFacility::new(self.secret.clone())),
        )
    }

    /// Returns the JSON file backing the named store.
    pub fn path_for(&self, name: &str) -> std::path::PathBuf {
        FileProvider::new(self.dir.path()).path_for(name)
    }
}

impl Default for FileTestStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Runs a test with a fresh in-memory fixture.
pub fn with_test_store<F, R>(f: F) -> R
where
    F: FnOnce(&TestStore) -> R,
{
    f(&TestStore::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use securekv_core::Outcome;

    #[test]
    fn store_instances_share_state() {
        let fixture = TestStore::new();
        fixture.store().write("k", "v").unwrap();
        assert_eq!(
            fixture.store().read("k").unwrap(),
            Outcome::Value(Some("v".to_string()))
        );
    }

    #[test]
    fn seeded_legacy_entry_lands_in_legacy_store() {
        let fixture = TestStore::new();
        fixture.seed_legacy_entry("a", "1");
        assert!(fixture.raw_legacy().contains(&fixture.physical_key("a")).unwrap());
        assert!(fixture.raw_current().is_empty());
    }

    #[test]
    fn with_test_store_runs_closure() {
        let n = with_test_store(|fixture| {
            fixture.store().write("x", "y").unwrap();
            fixture.store().read_all().unwrap().value().unwrap().len()
        });
        assert_eq!(n, 1);
    }
}
