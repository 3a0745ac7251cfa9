//! Key material and value encryption.
//!
//! ## Security Model
//!
//! - Master keys come from a [`KeyFacility`] and are never persisted here
//! - New values use AES-256-GCM ([`CipherV2`]) with a random nonce per call
//! - Values written by the v1 scheme ([`LegacyCipherV1`]) can be read but
//!   never written by the store
//! - Every persisted value is an [`Envelope`] recording its scheme, so the
//!   [`CipherFactory`] can pick the right cipher for existing data
//! - Keys are zeroized on drop

mod cipher;
mod factory;
mod key;
mod legacy;
mod metadata;
mod provider;

pub use cipher::{Cipher, CipherV2, StorageCipher, NONCE_SIZE, TAG_SIZE, V2_PARAMETERS};
pub use factory::CipherFactory;
pub use key::{
    derive_key, DerivedKeyFacility, InMemoryKeyFacility, KeyFacility, KeySpec, SymmetricKey,
    KEY_SIZE,
};
pub use legacy::{LegacyCipherV1, BLOCK_SIZE, IV_SIZE, V1_PARAMETERS};
pub use metadata::{CipherMetadata, CipherVersion, Envelope, ENVELOPE_HEADER_SIZE, ENVELOPE_MAGIC};
pub use provider::{CipherProvider, KeyPurpose};
