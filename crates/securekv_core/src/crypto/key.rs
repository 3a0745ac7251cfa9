//! Symmetric key material and protected key facilities.

use crate::error::{CipherError, CipherResult};
use hkdf::Hkdf;
use parking_lot::Mutex;
use rand::RngCore;
use sha2::Sha256;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// Size of a master key in bytes (256 bits).
pub const KEY_SIZE: usize = 32;

/// HKDF info string for keys derived by [`DerivedKeyFacility`].
const DERIVED_KEY_INFO: &[u8] = b"securekv-master-key-v1";

/// A 256-bit symmetric key.
///
/// The key is automatically zeroized when dropped.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SymmetricKey {
    bytes: [u8; KEY_SIZE],
}

impl SymmetricKey {
    /// Generates a new random key.
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_SIZE];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self { bytes }
    }

    /// Creates a key from raw bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the slice is not exactly 32 bytes.
    pub fn from_bytes(bytes: &[u8]) -> CipherResult<Self> {
        if bytes.len() != KEY_SIZE {
            return Err(CipherError::InvalidKeySize {
                expected: KEY_SIZE,
                actual: bytes.len(),
            });
        }

        let mut key_bytes = [0u8; KEY_SIZE];
        key_bytes.copy_from_slice(bytes);
        Ok(Self { bytes: key_bytes })
    }

    /// Returns the key bytes.
    ///
    /// # Security
    ///
    /// Don't log or persist the result.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }
}

impl std::fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SymmetricKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// Derives a key with HKDF-SHA256.
///
/// This is the deterministic fallback used when no protected key facility
/// exists: the same `secret`, `salt` and `info` always yield the same key.
/// HKDF is not a password hash; `secret` must already be high-entropy.
///
/// # Errors
///
/// Returns an error if HKDF expansion fails.
pub fn derive_key(secret: &[u8], salt: &[u8], info: &[u8]) -> CipherResult<SymmetricKey> {
    let hk = Hkdf::<Sha256>::new(Some(salt), secret);

    let mut bytes = [0u8; KEY_SIZE];
    hk.expand(info, &mut bytes)
        .map_err(|_| CipherError::encryption_failed("HKDF expand failed"))?;

    Ok(SymmetricKey { bytes })
}

/// Parameters requested from a key facility.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeySpec {
    /// Algorithm the key is for.
    pub algorithm: &'static str,
    /// Key size in bits.
    pub size_bits: u16,
}

impl KeySpec {
    /// AES with a 256-bit key.
    #[must_use]
    pub const fn aes256() -> Self {
        Self {
            algorithm: "AES",
            size_bits: 256,
        }
    }
}

/// An OS- or hardware-backed facility holding symmetric keys.
///
/// Repeated calls with the same alias must return the same key for as long
/// as the facility keeps the entry.
pub trait KeyFacility: Send + Sync {
    /// Returns the key stored under `alias`, creating it on first use.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::KeyUnavailable`] if the facility cannot
    /// generate or retrieve the key.
    fn get_or_create_key(&self, alias: &str, spec: &KeySpec) -> CipherResult<SymmetricKey>;
}

/// A process-local key facility holding random keys.
///
/// Availability can be switched off to simulate a device without a usable
/// keystore, and individual entries can be invalidated to simulate the OS
/// dropping a key after a security-state change.
#[derive(Debug)]
pub struct InMemoryKeyFacility {
    keys: Mutex<HashMap<String, SymmetricKey>>,
    blocked: Mutex<HashSet<String>>,
    available: AtomicBool,
}

impl Default for InMemoryKeyFacility {
    fn default() -> Self {
        Self {
            keys: Mutex::new(HashMap::new()),
            blocked: Mutex::new(HashSet::new()),
            available: AtomicBool::new(true),
        }
    }
}

impl InMemoryKeyFacility {
    /// Creates an available facility with no keys.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables or disables the facility.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Enables or disables a single alias. A disabled alias keeps its key.
    pub fn set_alias_available(&self, alias: &str, available: bool) {
        let mut blocked = self.blocked.lock();
        if available {
            blocked.remove(alias);
        } else {
            blocked.insert(alias.to_string());
        }
    }

    /// Drops the key stored under `alias`; the next request creates a new one.
    pub fn invalidate(&self, alias: &str) {
        self.keys.lock().remove(alias);
    }
}

impl KeyFacility for InMemoryKeyFacility {
    fn get_or_create_key(&self, alias: &str, spec: &KeySpec) -> CipherResult<SymmetricKey> {
        if !self.available.load(Ordering::SeqCst) {
            return Err(CipherError::key_unavailable(alias, "key facility disabled"));
        }
        if self.blocked.lock().contains(alias) {
            return Err(CipherError::key_unavailable(alias, "alias disabled"));
        }
        if usize::from(spec.size_bits) != KEY_SIZE * 8 {
            return Err(CipherError::key_unavailable(
                alias,
                format!("unsupported key size {} bits", spec.size_bits),
            ));
        }
        Ok(self
            .keys
            .lock()
            .entry(alias.to_string())
            .or_insert_with(SymmetricKey::generate)
            .clone())
    }
}

/// A facility deriving keys deterministically from a device secret.
///
/// Each alias gets its own key: HKDF-SHA256 with the alias as salt.
pub struct DerivedKeyFacility {
    secret: Zeroizing<Vec<u8>>,
}

impl DerivedKeyFacility {
    /// Creates a facility over `secret`.
    #[must_use]
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: Zeroizing::new(secret.into()),
        }
    }
}

impl std::fmt::Debug for DerivedKeyFacility {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DerivedKeyFacility")
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

impl KeyFacility for DerivedKeyFacility {
    fn get_or_create_key(&self, alias: &str, spec: &KeySpec) -> CipherResult<SymmetricKey> {
        if self.secret.is_empty() {
            return Err(CipherError::key_unavailable(alias, "empty device secret"));
        }
        if usize::from(spec.size_bits) != KEY_SIZE * 8 {
            return Err(CipherError::key_unavailable(
                alias,
                format!("unsupported key size {} bits", spec.size_bits),
            ));
        }
        derive_key(&self.secret, alias.as_bytes(), DERIVED_KEY_INFO)
    }
}
