//! The current, authenticated preferences backend.
//!
//! Wraps a raw [`PreferencesBackend`] so every value is sealed with the
//! current cipher before it reaches storage. Keys stay in plaintext so
//! prefix scans and deletions work without the master key.

use crate::crypto::{CipherFactory, CipherV2, Envelope, StorageCipher, SymmetricKey};
use crate::error::{CipherError, StoreError, StoreResult};
use crate::namespace::KeyPrefixCodec;
use securekv_storage::PreferencesBackend;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Reserved key holding the key-check record.
///
/// Every physical key produced by [`KeyPrefixCodec::encode`] contains the
/// `_` separator and this one does not, so no prefix/key pair can overwrite
/// the record.
pub const KEY_CHECK_KEY: &str = "securekv.key-check";

const KEY_CHECK_PLAINTEXT: &[u8] = b"securekv key check";

/// A preferences backend whose values are encrypted with [`CipherV2`].
pub struct EncryptedPreferences {
    raw: Arc<dyn PreferencesBackend>,
    key: SymmetricKey,
    cipher: CipherV2,
}

impl EncryptedPreferences {
    /// Opens the encrypted view over `raw` using `key`.
    ///
    /// On first open a key-check record is written. Later opens require
    /// that record to decrypt under `key`; a mismatch means the persisted
    /// state is corrupt or the key was replaced.
    ///
    /// # Errors
    ///
    /// Returns the cipher error from the key check, or a storage error.
    pub fn open(raw: Arc<dyn PreferencesBackend>, key: SymmetricKey) -> StoreResult<Self> {
        let prefs = Self {
            raw,
            key,
            cipher: CipherFactory::current(),
        };

        match prefs.raw.get(KEY_CHECK_KEY)? {
            Some(text) => {
                let check = prefs.open_envelope(&text)?;
                if check != KEY_CHECK_PLAINTEXT {
                    return Err(CipherError::AuthenticationFailed.into());
                }
            }
            None => {
                let sealed = prefs.seal(KEY_CHECK_PLAINTEXT)?;
                prefs.raw.put(KEY_CHECK_KEY, &sealed)?;
                tracing::debug!(store = prefs.raw.name(), "key check record written");
            }
        }

        Ok(prefs)
    }

    /// Returns the physical store name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.raw.name()
    }

    /// Reads and decrypts the value under `physical_key`.
    ///
    /// # Errors
    ///
    /// Returns a cipher error if the stored value does not decrypt, or
    /// [`StoreError::InvalidUtf8`] if the plaintext is not text.
    pub fn get(&self, physical_key: &str) -> StoreResult<Option<String>> {
        match self.raw.get(physical_key)? {
            Some(text) => self.decrypt_value(physical_key, &text).map(Some),
            None => Ok(None),
        }
    }

    /// Encrypts `value` and stores it under `physical_key`.
    ///
    /// Always re-encrypts, even if the same value is already stored.
    ///
    /// # Errors
    ///
    /// Returns an error if encryption or the write fails.
    pub fn put(&self, physical_key: &str, value: &str) -> StoreResult<()> {
        let sealed = self.seal(value.as_bytes())?;
        self.raw.put(physical_key, &sealed)?;
        Ok(())
    }

    /// Removes `physical_key`; removing a missing key succeeds.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the removal fails.
    pub fn remove(&self, physical_key: &str) -> StoreResult<()> {
        self.raw.remove(physical_key)?;
        Ok(())
    }

    /// Checks whether `physical_key` exists without decrypting it.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the lookup fails.
    pub fn contains(&self, physical_key: &str) -> StoreResult<bool> {
        Ok(self.raw.contains(physical_key)?)
    }

    /// Returns the still-encrypted entries owned by `codec`.
    ///
    /// # Errors
    ///
    /// Returns a storage error if enumeration fails.
    pub fn sealed_entries(&self, codec: &KeyPrefixCodec) -> StoreResult<BTreeMap<String, String>> {
        let mut all = self.raw.all()?;
        all.retain(|k, _| codec.owns(k));
        Ok(all)
    }

    /// Removes every entry owned by `codec` and returns how many were removed.
    ///
    /// # Errors
    ///
    /// Returns a storage error if enumeration or a removal fails.
    pub fn remove_owned(&self, codec: &KeyPrefixCodec) -> StoreResult<usize> {
        let keys: Vec<String> = self.sealed_entries(codec)?.into_keys().collect();
        for key in &keys {
            self.raw.remove(key)?;
        }
        Ok(keys.len())
    }

    /// Decrypts one stored value read from `physical_key`.
    ///
    /// # Errors
    ///
    /// See [`get`](Self::get).
    pub fn decrypt_value(&self, physical_key: &str, text: &str) -> StoreResult<String> {
        let plaintext = self.open_envelope(text)?;
        String::from_utf8(plaintext).map_err(|_| StoreError::InvalidUtf8 {
            key: physical_key.to_string(),
        })
    }

    fn seal(&self, plaintext: &[u8]) -> StoreResult<String> {
        let blob = self.cipher.encrypt(plaintext, &self.key)?;
        Ok(Envelope::new(self.cipher.metadata(), blob).to_text()?)
    }

    fn open_envelope(&self, text: &str) -> StoreResult<Vec<u8>> {
        let envelope = Envelope::from_text(text)?;
        if !CipherFactory::is_current(&envelope.metadata) {
            // Only the migrator reads older schemes.
            let version = envelope.metadata.scheme_version;
            return Err(CipherError::unknown_version(Some(version)).into());
        }
        Ok(self.cipher.decrypt(&envelope.blob, &self.key)?)
    }
}

impl std::fmt::Debug for EncryptedPreferences {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptedPreferences")
            .field("store", &self.raw.name())
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}
