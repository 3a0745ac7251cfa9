//! Integration tests over the JSON file backend.

use securekv_core::crypto::{
    CipherProvider, DerivedKeyFacility, Envelope, KeyPurpose, LegacyCipherV1, StorageCipher,
};
use securekv_core::{KeyPrefixCodec, Outcome, StoreState};
use securekv_storage::{FileProvider, PreferencesBackend, PreferencesProvider};
use securekv_testkit::FileTestStore;
use std::sync::Arc;

#[test]
fn values_survive_relaunch() {
    let fixture = FileTestStore::new();
    fixture.store().write("token", "abc123").unwrap();

    let relaunched = fixture.store();
    assert_eq!(
        relaunched.read("token").unwrap(),
        Outcome::Value(Some("abc123".to_string()))
    );
}

#[test]
fn different_secret_resets_current_store() {
    let mut fixture = FileTestStore::new();
    fixture.store().write("token", "abc123").unwrap();

    fixture.secret = b"another device".to_vec();
    let store = fixture.store();
    assert_eq!(store.read("token").unwrap(), Outcome::Value(None));
    assert_eq!(store.state(), StoreState::Ready);
}

#[test]
fn unparsable_file_is_cleared_and_retried() {
    let fixture = FileTestStore::new();
    let path = fixture.path_for(&fixture.config.store_name);
    std::fs::write(&path, b"{ not json").unwrap();

    let store = fixture.store();
    store.write("k", "v").unwrap();
    assert_eq!(store.state(), StoreState::Ready);
    assert_eq!(
        fixture.store().read("k").unwrap(),
        Outcome::Value(Some("v".to_string()))
    );
}

#[test]
fn legacy_file_is_migrated() {
    let fixture = FileTestStore::new();
    let provider = FileProvider::new(fixture.dir.path());
    let key = CipherProvider::new(Arc::new(DerivedKeyFacility::new(fixture.secret.clone())))
        .master_key(KeyPurpose::Legacy)
        .unwrap();
    let blob = LegacyCipherV1.encrypt(b"old value", &key).unwrap();
    let text = Envelope::new(LegacyCipherV1.metadata(), blob).to_text().unwrap();
    let codec = KeyPrefixCodec::new(&fixture.config.key_prefix);
    provider
        .open(&fixture.config.legacy_store_name)
        .unwrap()
        .put(&codec.encode("old"), &text)
        .unwrap();

    let store = fixture.store();
    assert_eq!(
        store.read("old").unwrap(),
        Outcome::Value(Some("old value".to_string()))
    );
    assert_eq!(store.last_migration().unwrap().migrated.len(), 1);

    let legacy = FileProvider::new(fixture.dir.path())
        .open(&fixture.config.legacy_store_name)
        .unwrap();
    assert!(legacy.all().unwrap().is_empty());
}
