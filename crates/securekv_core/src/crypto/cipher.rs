//! The storage cipher capability and the current AEAD scheme.

use super::key::SymmetricKey;
use super::legacy::LegacyCipherV1;
use super::metadata::{CipherMetadata, CipherVersion};
use crate::error::{CipherError, CipherResult};
use aes_gcm::{
    aead::{generic_array::GenericArray, Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use rand::RngCore;

/// Size of the GCM nonce in bytes.
pub const NONCE_SIZE: usize = 12;
/// Size of the GCM authentication tag in bytes.
pub const TAG_SIZE: usize = 16;

/// Parameter descriptor persisted for [`CipherV2`].
pub const V2_PARAMETERS: &[u8] = b"AES/GCM/NoPadding";

/// Encrypts and decrypts a single value under one scheme.
///
/// Each implementation defines a self-contained blob layout: decrypting
/// needs only the key and the blob.
pub trait StorageCipher: Send + Sync {
    /// Scheme implemented by this cipher.
    fn version(&self) -> CipherVersion;

    /// Parameter descriptor persisted with every blob.
    fn parameters(&self) -> &'static [u8];

    /// Metadata to record alongside blobs produced by this cipher.
    fn metadata(&self) -> CipherMetadata {
        CipherMetadata::new(self.version(), self.parameters())
    }

    /// Encrypts `plaintext` under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the primitive rejects the input.
    fn encrypt(&self, plaintext: &[u8], key: &SymmetricKey) -> CipherResult<Vec<u8>>;

    /// Decrypts `blob` under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::MalformedBlob`] for a blob of the wrong shape
    /// and [`CipherError::AuthenticationFailed`] when integrity checks fail.
    fn decrypt(&self, blob: &[u8], key: &SymmetricKey) -> CipherResult<Vec<u8>>;
}

/// The current scheme: AES-256-GCM.
///
/// Blob layout: `nonce (12 bytes) || ciphertext || tag (16 bytes)`. A fresh
/// random nonce is drawn for every call to [`encrypt`](StorageCipher::encrypt);
/// nonces are never derived from the key or the content.
#[derive(Debug, Clone, Copy, Default)]
pub struct CipherV2;

impl CipherV2 {
    fn aead(key: &SymmetricKey) -> Aes256Gcm {
        Aes256Gcm::new(GenericArray::from_slice(key.as_bytes()))
    }
}

impl StorageCipher for CipherV2 {
    fn version(&self) -> CipherVersion {
        CipherVersion::V2
    }

    fn parameters(&self) -> &'static [u8] {
        V2_PARAMETERS
    }

    fn encrypt(&self, plaintext: &[u8], key: &SymmetricKey) -> CipherResult<Vec<u8>> {
        let mut nonce_bytes = [0u8; NONCE_SIZE];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = Self::aead(key)
            .encrypt(nonce, plaintext)
            .map_err(|_| CipherError::encryption_failed("AES-GCM encryption error"))?;

        let mut blob = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        blob.extend_from_slice(&nonce_bytes);
        blob.extend(ciphertext);
        Ok(blob)
    }

    fn decrypt(&self, blob: &[u8], key: &SymmetricKey) -> CipherResult<Vec<u8>> {
        if blob.len() < NONCE_SIZE + TAG_SIZE {
            return Err(CipherError::malformed(format!(
                "v2 blob too short: expected at least {} bytes, got {}",
                NONCE_SIZE + TAG_SIZE,
                blob.len()
            )));
        }

        let nonce = Nonce::from_slice(&blob[..NONCE_SIZE]);
        Self::aead(key)
            .decrypt(nonce, &blob[NONCE_SIZE..])
            .map_err(|_| CipherError::AuthenticationFailed)
    }
}

/// One of the known schemes, as resolved from persisted metadata.
#[derive(Debug, Clone, Copy)]
pub enum Cipher {
    /// [`LegacyCipherV1`].
    Legacy(LegacyCipherV1),
    /// [`CipherV2`].
    Current(CipherV2),
}

impl StorageCipher for Cipher {
    fn version(&self) -> CipherVersion {
        match self {
            Self::Legacy(c) => c.version(),
            Self::Current(c) => c.version(),
        }
    }

    fn parameters(&self) -> &'static [u8] {
        match self {
            Self::Legacy(c) => c.parameters(),
            Self::Current(c) => c.parameters(),
        }
    }

    fn encrypt(&self, plaintext: &[u8], key: &SymmetricKey) -> CipherResult<Vec<u8>> {
        match self {
            Self::Legacy(c) => c.encrypt(plaintext, key),
            Self::Current(c) => c.encrypt(plaintext, key),
        }
    }

    fn decrypt(&self, blob: &[u8], key: &SymmetricKey) -> CipherResult<Vec<u8>> {
        match self {
            Self::Legacy(c) => c.decrypt(blob, key),
            Self::Current(c) => c.decrypt(blob, key),
        }
    }
}
