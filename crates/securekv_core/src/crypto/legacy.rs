//! The v1 scheme, kept to read data written by older installations.
//!
//! Blob layout: `iv (16 bytes) || AES-256-CBC ciphertext (PKCS#7 padded)`.
//! There is no authentication tag: a wrong key or a flipped bit usually
//! shows up as bad padding, but is not guaranteed to. The store never picks
//! this scheme for new writes.

use super::cipher::StorageCipher;
use super::key::SymmetricKey;
use super::metadata::CipherVersion;
use crate::error::{CipherError, CipherResult};
use cbc::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use rand::RngCore;

/// Size of the CBC initialization vector (one AES block).
pub const IV_SIZE: usize = 16;
/// AES block size.
pub const BLOCK_SIZE: usize = 16;

/// Parameter descriptor persisted for [`LegacyCipherV1`].
pub const V1_PARAMETERS: &[u8] = b"AES/CBC/PKCS7Padding";

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

/// AES-256-CBC with PKCS#7 padding and a prepended IV.
#[derive(Debug, Clone, Copy, Default)]
pub struct LegacyCipherV1;

impl StorageCipher for LegacyCipherV1 {
    fn version(&self) -> CipherVersion {
        CipherVersion::V1
    }

    fn parameters(&self) -> &'static [u8] {
        V1_PARAMETERS
    }

    /// Produces a v1 blob. Only used to build fixtures for migration.
    fn encrypt(&self, plaintext: &[u8], key: &SymmetricKey) -> CipherResult<Vec<u8>> {
        let mut iv = [0u8; IV_SIZE];
        rand::thread_rng().fill_bytes(&mut iv);

        let encryptor = Aes256CbcEnc::new_from_slices(key.as_bytes(), &iv)
            .map_err(|_| CipherError::encryption_failed("invalid CBC key or IV length"))?;
        let ciphertext = encryptor.encrypt_padded_vec_mut::<Pkcs7>(plaintext);

        let mut blob = Vec::with_capacity(IV_SIZE + ciphertext.len());
        blob.extend_from_slice(&iv);
        blob.extend(ciphertext);
        Ok(blob)
    }

    fn decrypt(&self, blob: &[u8], key: &SymmetricKey) -> CipherResult<Vec<u8>> {
        if blob.len() < IV_SIZE + BLOCK_SIZE {
            return Err(CipherError::malformed(format!(
                "v1 blob too short: expected at least {} bytes, got {}",
                IV_SIZE + BLOCK_SIZE,
                blob.len()
            )));
        }
        let (iv, ciphertext) = blob.split_at(IV_SIZE);
        if ciphertext.len() % BLOCK_SIZE != 0 {
            return Err(CipherError::malformed(format!(
                "v1 ciphertext length {} is not a multiple of {BLOCK_SIZE}",
                ciphertext.len()
            )));
        }

        let decryptor = Aes256CbcDec::new_from_slices(key.as_bytes(), iv)
            .map_err(|_| CipherError::malformed("invalid CBC key or IV length"))?;
        decryptor
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
            .map_err(|_| CipherError::AuthenticationFailed)
    }
}
