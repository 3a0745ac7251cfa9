//! Migration of legacy entries into the current backend.
//!
//! Legacy entries are moved one at a time:
//!
//! 1. decode the envelope and resolve its cipher from the recorded metadata
//! 2. decrypt with the legacy master key
//! 3. write the plaintext into the current backend (re-encrypted with v2)
//! 4. delete the legacy entry
//!
//! The write always happens before the delete. A key already present in
//! the current backend is never overwritten: its legacy copy is stale
//! (left by a crash between write and delete, or superseded by a later
//! write) and is only deleted. A failure on one entry is logged and
//! recorded in the [`MigrationReport`]; the legacy copy is kept and the
//! pass continues.

use crate::crypto::{
    CipherFactory, CipherProvider, Envelope, KeyPurpose, StorageCipher, SymmetricKey,
};
use crate::encrypted::EncryptedPreferences;
use crate::error::{StoreError, StoreResult};
use crate::namespace::KeyPrefixCodec;
use securekv_storage::PreferencesBackend;

/// A legacy entry that could not be migrated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationFailure {
    /// Physical key of the entry, left in the legacy store.
    pub key: String,
    /// Why it failed.
    pub error: String,
}

/// Outcome of one migration pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    /// Physical keys moved into the current backend.
    pub migrated: Vec<String>,
    /// Legacy copies deleted because the current backend already held the key.
    pub superseded: Vec<String>,
    /// Entries left behind.
    pub failed: Vec<MigrationFailure>,
}

impl MigrationReport {
    /// Returns `true` if the pass found nothing to migrate.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.migrated.is_empty() && self.superseded.is_empty() && self.failed.is_empty()
    }
}

/// Moves entries owned by one logical store from a legacy backend into the
/// current backend.
pub struct Migrator<'a> {
    legacy: &'a dyn PreferencesBackend,
    current: &'a EncryptedPreferences,
    codec: &'a KeyPrefixCodec,
    keys: &'a CipherProvider,
}

impl<'a> Migrator<'a> {
    /// Creates a migrator.
    #[must_use]
    pub fn new(
        legacy: &'a dyn PreferencesBackend,
        current: &'a EncryptedPreferences,
        codec: &'a KeyPrefixCodec,
        keys: &'a CipherProvider,
    ) -> Self {
        Self {
            legacy,
            current,
            codec,
            keys,
        }
    }

    /// Runs one pass over the legacy backend.
    ///
    /// Legacy copies of keys the current backend already holds are deleted
    /// without being decrypted. The legacy master key is only requested
    /// when something is left to migrate. If it cannot be obtained, every
    /// remaining entry fails and is kept.
    ///
    /// # Errors
    ///
    /// Returns an error only if the legacy backend cannot be enumerated.
    pub fn run(&self) -> StoreResult<MigrationReport> {
        let mut pending = self.legacy.all()?;
        pending.retain(|k, _| self.codec.owns(k));

        let mut report = MigrationReport::default();
        if pending.is_empty() {
            tracing::debug!(store = self.legacy.name(), "no legacy entries to migrate");
            return Ok(report);
        }

        tracing::info!(
            store = self.legacy.name(),
            entries = pending.len(),
            "migrating legacy entries"
        );

        pending.retain(|key, _| match self.retire_if_superseded(key) {
            Ok(false) => true,
            Ok(true) => {
                report.superseded.push(key.clone());
                false
            }
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "stale legacy entry not removed");
                report.failed.push(MigrationFailure {
                    key: key.clone(),
                    error: e.to_string(),
                });
                false
            }
        });
        if pending.is_empty() {
            tracing::info!(
                superseded = report.superseded.len(),
                failed = report.failed.len(),
                "legacy migration pass finished"
            );
            return Ok(report);
        }

        let legacy_key = match self.keys.master_key(KeyPurpose::Legacy) {
            Ok(key) => key,
            Err(e) => {
                tracing::warn!(error = %e, "legacy key unavailable; keeping legacy entries");
                report
                    .failed
                    .extend(pending.into_keys().map(|key| MigrationFailure {
                        key,
                        error: e.to_string(),
                    }));
                return Ok(report);
            }
        };

        for (key, text) in pending {
            match self.migrate_entry(&key, &text, &legacy_key) {
                Ok(()) => report.migrated.push(key),
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "legacy entry not migrated");
                    report.failed.push(MigrationFailure {
                        key,
                        error: e.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            migrated = report.migrated.len(),
            superseded = report.superseded.len(),
            failed = report.failed.len(),
            "legacy migration pass finished"
        );
        Ok(report)
    }

    fn retire_if_superseded(&self, key: &str) -> StoreResult<bool> {
        if !self.current.contains(key)? {
            return Ok(false);
        }
        self.legacy.remove(key)?;
        Ok(true)
    }

    fn migrate_entry(&self, key: &str, text: &str, legacy_key: &SymmetricKey) -> StoreResult<()> {
        let envelope = Envelope::from_text(text)?;
        let cipher = CipherFactory::resolve(&envelope.metadata)?;
        let plaintext = cipher.decrypt(&envelope.blob, legacy_key)?;
        let value = String::from_utf8(plaintext).map_err(|_| StoreError::InvalidUtf8 {
            key: key.to_string(),
        })?;

        self.current.put(key, &value)?;
        self.legacy.remove(key)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{InMemoryKeyFacility, LegacyCipherV1};
    use securekv_storage::InMemoryPreferences;
    use std::sync::Arc;

    struct Fixture {
        legacy: InMemoryPreferences,
        current: EncryptedPreferences,
        keys: CipherProvider,
        codec: KeyPrefixCodec,
    }

    impl Fixture {
        fn new() -> Self {
            let keys = CipherProvider::new(Arc::new(InMemoryKeyFacility::new()));
            let current_key = keys.master_key(KeyPurpose::Current).unwrap();
            Self {
                legacy: InMemoryPreferences::new("legacy"),
                current: EncryptedPreferences::open(
                    Arc::new(InMemoryPreferences::new("current")),
                    current_key,
                )
                .unwrap(),
                keys,
                codec: KeyPrefixCodec::new("p"),
            }
        }

        fn seed(&self, logical: &str, value: &str) {
            let key = self.keys.master_key(KeyPurpose::Legacy).unwrap();
            let blob = LegacyCipherV1.encrypt(value.as_bytes(), &key).unwrap();
            let text = Envelope::new(LegacyCipherV1.metadata(), blob).to_text().unwrap();
            self.legacy.put(&self.codec.encode(logical), &text).unwrap();
        }

        fn run(&self) -> MigrationReport {
            Migrator::new(&self.legacy, &self.current, &self.codec, &self.keys)
                .run()
                .unwrap()
        }
    }

    #[test]
    fn moves_entries_and_deletes_legacy_copies() {
        let fx = Fixture::new();
        fx.seed("a", "alpha");
        fx.seed("b", "beta");

        let report = fx.run();
        assert_eq!(report.migrated, vec!["p_a", "p_b"]);
        assert!(report.failed.is_empty());
        assert!(fx.legacy.is_empty());
        assert_eq!(fx.current.get("p_a").unwrap().as_deref(), Some("alpha"));
        assert_eq!(fx.current.get("p_b").unwrap().as_deref(), Some("beta"));
    }

    #[test]
    fn empty_legacy_is_noop() {
        let fx = Fixture::new();
        assert!(fx.run().is_noop());
    }

    #[test]
    fn foreign_prefix_is_untouched() {
        let fx = Fixture::new();
        fx.legacy.put("other_x", "whatever").unwrap();
        assert!(fx.run().is_noop());
        assert!(fx.legacy.contains("other_x").unwrap());
    }

    #[test]
    fn unknown_version_is_kept() {
        let fx = Fixture::new();
        let envelope = Envelope::new(
            crate::crypto::CipherMetadata {
                scheme_version: 9,
                algorithm_parameters: Vec::new(),
            },
            vec![0; 32],
        );
        fx.legacy.put("p_odd", &envelope.to_text().unwrap()).unwrap();
        fx.seed("good", "ok");

        let report = fx.run();
        assert_eq!(report.migrated, vec!["p_good"]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].key, "p_odd");
        assert!(fx.legacy.contains("p_odd").unwrap());
        assert!(!fx.current.contains("p_odd").unwrap());
    }

    #[test]
    fn second_pass_finds_nothing() {
        let fx = Fixture::new();
        fx.seed("a", "alpha");
        fx.run();
        let before = fx.current.sealed_entries(&fx.codec).unwrap().len();

        assert!(fx.run().is_noop());
        assert_eq!(fx.current.sealed_entries(&fx.codec).unwrap().len(), before);
    }

    #[test]
    fn current_value_wins_over_legacy_copy() {
        let fx = Fixture::new();
        fx.seed("a", "old");
        fx.seed("b", "beta");
        fx.current.put("p_a", "new").unwrap();

        let report = fx.run();
        assert_eq!(report.migrated, vec!["p_b"]);
        assert_eq!(report.superseded, vec!["p_a"]);
        assert!(fx.legacy.is_empty());
        assert_eq!(fx.current.get("p_a").unwrap().as_deref(), Some("new"));
    }

    #[test]
    fn superseded_copy_is_removed_without_legacy_key() {
        let facility = Arc::new(InMemoryKeyFacility::new());
        let keys = CipherProvider::new(facility.clone());
        let current = EncryptedPreferences::open(
            Arc::new(InMemoryPreferences::new("current")),
            keys.master_key(KeyPurpose::Current).unwrap(),
        )
        .unwrap();
        current.put("p_a", "new").unwrap();
        let legacy = InMemoryPreferences::new("legacy");
        legacy.put("p_a", "anything").unwrap();
        facility.set_available(false);

        let codec = KeyPrefixCodec::new("p");
        let report = Migrator::new(&legacy, &current, &codec, &keys).run().unwrap();
        assert_eq!(report.superseded, vec!["p_a"]);
        assert!(report.failed.is_empty());
        assert!(legacy.is_empty());
    }

    #[test]
    fn missing_legacy_key_keeps_everything() {
        let facility = Arc::new(InMemoryKeyFacility::new());
        let keys = CipherProvider::new(facility.clone());
        let current = EncryptedPreferences::open(
            Arc::new(InMemoryPreferences::new("current")),
            keys.master_key(KeyPurpose::Current).unwrap(),
        )
        .unwrap();
        let legacy = InMemoryPreferences::new("legacy");
        legacy.put("p_a", "anything").unwrap();
        facility.set_available(false);

        let codec = KeyPrefixCodec::new("p");
        let report = Migrator::new(&legacy, &current, &codec, &keys).run().unwrap();
        assert!(report.migrated.is_empty());
        assert_eq!(report.failed.len(), 1);
        assert!(legacy.contains("p_a").unwrap());
    }
}
