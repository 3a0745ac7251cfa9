//! Master key access.

use super::key::{KeyFacility, KeySpec, SymmetricKey};
use crate::error::CipherResult;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// What a master key is used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyPurpose {
    /// Encrypting and decrypting entries in the current backend.
    Current,
    /// Decrypting entries left behind by the v1 scheme.
    Legacy,
}

impl KeyPurpose {
    /// Returns the facility alias the key is stored under.
    #[must_use]
    pub const fn alias(self) -> &'static str {
        match self {
            Self::Current => "securekv.master.v2",
            Self::Legacy => "securekv.master.v1",
        }
    }
}

/// Obtains master keys from a [`KeyFacility`].
///
/// Keys are fetched once per purpose and cached for the provider's lifetime;
/// they are never written anywhere but the facility itself.
pub struct CipherProvider {
    facility: Arc<dyn KeyFacility>,
    cache: Mutex<HashMap<KeyPurpose, SymmetricKey>>,
}

impl CipherProvider {
    /// Creates a provider over `facility`.
    #[must_use]
    pub fn new(facility: Arc<dyn KeyFacility>) -> Self {
        Self {
            facility,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the master key for `purpose`, creating it in the facility on
    /// first use.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::KeyUnavailable`](crate::CipherError::KeyUnavailable)
    /// if the facility cannot produce the key. Failures are not cached.
    pub fn master_key(&self, purpose: KeyPurpose) -> CipherResult<SymmetricKey> {
        let mut cache = self.cache.lock();
        if let Some(key) = cache.get(&purpose) {
            return Ok(key.clone());
        }

        let key = self
            .facility
            .get_or_create_key(purpose.alias(), &KeySpec::aes256())?;
        tracing::debug!(alias = purpose.alias(), "master key obtained");
        cache.insert(purpose, key.clone());
        Ok(key)
    }
}

impl std::fmt::Debug for CipherProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CipherProvider")
            .field("cached", &self.cache.lock().len())
            .finish_non_exhaustive()
    }
}
