//! Integration tests for the store façade.

use securekv_core::{CipherError, Outcome, StorageConfig, StoreError, StoreState};
use securekv_storage::PreferencesBackend;
use securekv_testkit::TestStore;
use std::collections::BTreeMap;

#[test]
fn end_to_end() {
    let fixture = TestStore::new();
    let store = fixture.store();

    assert_eq!(store.contains_key("missing").unwrap(), Outcome::Value(false));
    store.write("token", "abc123").unwrap();
    assert_eq!(
        store.read("token").unwrap(),
        Outcome::Value(Some("abc123".to_string()))
    );

    store.delete_all().unwrap();
    assert_eq!(store.read_all().unwrap(), Outcome::Value(BTreeMap::new()));
}

#[test]
fn stored_values_are_not_plaintext() {
    let fixture = TestStore::new();
    fixture.store().write("token", "abc123").unwrap();

    let raw = fixture.raw_current();
    let text = raw.get(&fixture.physical_key("token")).unwrap().unwrap();
    assert!(!text.contains("abc123"));
}

#[test]
fn prefixes_are_isolated() {
    let fixture = TestStore::new();
    let a = fixture.store_with(StorageConfig::new().key_prefix("A"));
    let b = fixture.store_with(StorageConfig::new().key_prefix("B"));

    a.write("shared", "from a").unwrap();
    a.write("only_a", "1").unwrap();
    b.write("shared", "from b").unwrap();

    let all_a = a.read_all().unwrap().value().unwrap();
    let all_b = b.read_all().unwrap().value().unwrap();
    assert_eq!(all_a.len(), 2);
    assert_eq!(all_b.len(), 1);
    assert_eq!(all_b["shared"], "from b");

    b.delete_all().unwrap();
    assert_eq!(a.read_all().unwrap().value().unwrap(), all_a);
    assert!(b.read_all().unwrap().value().unwrap().is_empty());
}

#[test]
fn corrupt_read_is_an_error_without_reset() {
    let fixture = TestStore::new();
    let store = fixture.store();
    store.write("k", "v").unwrap();
    fixture.corrupt_current_entry("k");

    let err = store.read("k").unwrap_err();
    assert!(matches!(
        err,
        StoreError::Cipher(CipherError::AuthenticationFailed)
    ));
    assert_eq!(store.contains_key("k").unwrap(), Outcome::Value(true));
}

#[test]
fn reset_on_error_wipes_and_reports() {
    let fixture = TestStore::with_config(StorageConfig::new().reset_on_error(true));
    let store = fixture.store();
    store.write("k", "v").unwrap();
    store.write("other", "w").unwrap();
    fixture.corrupt_current_entry("k");

    assert_eq!(store.read("k").unwrap(), Outcome::Reset);
    assert_eq!(store.contains_key("k").unwrap(), Outcome::Value(false));
    assert_eq!(store.contains_key("other").unwrap(), Outcome::Value(false));
    assert_eq!(store.state(), StoreState::Ready);
}

#[test]
fn reset_leaves_other_prefixes() {
    let fixture = TestStore::with_config(
        StorageConfig::new().key_prefix("A").reset_on_error(true),
    );
    let a = fixture.store();
    let b = fixture.store_with(StorageConfig::new().key_prefix("B"));
    a.write("k", "v").unwrap();
    b.write("k", "kept").unwrap();
    fixture.corrupt_current_entry("k");

    assert!(a.read("k").unwrap().is_reset());
    assert_eq!(
        b.read("k").unwrap(),
        Outcome::Value(Some("kept".to_string()))
    );
}

#[test]
fn read_all_drops_undecryptable_entries() {
    let fixture = TestStore::new();
    let store = fixture.store();
    store.write("good", "1").unwrap();
    store.write("bad", "2").unwrap();
    fixture.corrupt_current_entry("bad");

    let all = store.read_all().unwrap().value().unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all["good"], "1");
}

#[test]
fn key_check_record_is_hidden() {
    let fixture = TestStore::with_config(StorageConfig::new().key_prefix(""));
    let store = fixture.store();
    store.write("k", "v").unwrap();

    let all = store.read_all().unwrap().value().unwrap();
    assert_eq!(all.len(), 1);
    assert!(fixture
        .raw_current()
        .contains(securekv_core::KEY_CHECK_KEY)
        .unwrap());
}

#[test]
fn user_keys_cannot_overwrite_key_check_record() {
    for (prefix, logical) in [("", "_securekv_key_check__"), ("_", "securekv_key_check__")] {
        let fixture = TestStore::new();
        let other = StorageConfig::new().key_prefix("B");
        fixture.store_with(other.clone()).write("kept", "safe").unwrap();

        let store = fixture.store_with(StorageConfig::new().key_prefix(prefix));
        store.write(logical, "user value").unwrap();
        let all = store.read_all().unwrap().value().unwrap();
        assert_eq!(all.get(logical).map(String::as_str), Some("user value"));

        // Relaunch: the key check must still pass and keep every prefix.
        let relaunched = fixture.store_with(StorageConfig::new().key_prefix(prefix));
        assert_eq!(
            relaunched.read(logical).unwrap(),
            Outcome::Value(Some("user value".to_string()))
        );
        assert_eq!(
            fixture.store_with(other).read("kept").unwrap(),
            Outcome::Value(Some("safe".to_string()))
        );
    }
}

#[test]
fn corrupted_current_store_is_reset_once() {
    let fixture = TestStore::new();
    fixture.store().write("k", "v").unwrap();
    fixture.provider.poison(&fixture.config.store_name);

    let store = fixture.store();
    assert_eq!(store.read("k").unwrap(), Outcome::Value(None));
    assert_eq!(store.state(), StoreState::Ready);
}

#[test]
fn replaced_master_key_resets_current_store() {
    let fixture = TestStore::new();
    fixture.store().write("k", "v").unwrap();
    fixture.facility.invalidate("securekv.master.v2");

    let store = fixture.store();
    assert_eq!(store.read("k").unwrap(), Outcome::Value(None));
    store.write("k", "new").unwrap();
    assert_eq!(
        store.read("k").unwrap(),
        Outcome::Value(Some("new".to_string()))
    );
}

#[test]
fn key_facility_failure_is_terminal() {
    let fixture = TestStore::with_config(StorageConfig::new().reset_on_error(true));
    fixture.facility.set_available(false);
    let store = fixture.store();

    assert!(matches!(
        store.write("k", "v"),
        Err(StoreError::InitializationFailure { .. })
    ));
    assert_eq!(store.state(), StoreState::Unavailable);

    fixture.facility.set_available(true);
    for result in [
        store.read("k").map(|_| ()),
        store.contains_key("k").map(|_| ()),
        store.delete("k").map(|_| ()),
        store.delete_all().map(|_| ()),
        store.read_all().map(|_| ()),
    ] {
        assert!(matches!(result, Err(StoreError::StoreUnavailable { .. })));
    }

    // A new store object starts over.
    assert!(fixture.store().write("k", "v").is_ok());
}
