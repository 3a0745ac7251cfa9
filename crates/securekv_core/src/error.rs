//! Error types for securekv core.

use securekv_storage::StorageError;
use thiserror::Error;

/// Result type for cipher and key operations.
pub type CipherResult<T> = Result<T, CipherError>;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised while obtaining keys or encrypting/decrypting a single value.
///
/// Messages never include key material or plaintext.
#[derive(Debug, Error)]
pub enum CipherError {
    /// The authentication tag did not verify (wrong key or tampered blob).
    #[error("authentication failed: ciphertext does not verify")]
    AuthenticationFailed,

    /// The blob or envelope does not have the layout its scheme requires.
    #[error("malformed blob: {message}")]
    MalformedBlob {
        /// Description of the layout problem.
        message: String,
    },

    /// The persisted parameters do not match the scheme they claim.
    #[error("unsupported parameters for cipher v{version}: {parameters}")]
    UnsupportedParameters {
        /// Scheme version from the metadata.
        version: u16,
        /// The parameter descriptor that was rejected.
        parameters: String,
    },

    /// The version tag is absent or not one this build knows.
    #[error("unknown cipher version: {tag}")]
    UnknownCipherVersion {
        /// The tag as found, or `"absent"`.
        tag: String,
    },

    /// The protected key facility could not produce a key.
    #[error("key unavailable for alias '{alias}': {reason}")]
    KeyUnavailable {
        /// Key alias requested.
        alias: String,
        /// Why the facility refused.
        reason: String,
    },

    /// Key material of the wrong length was supplied.
    #[error("invalid key size: expected {expected} bytes, got {actual}")]
    InvalidKeySize {
        /// Expected size in bytes.
        expected: usize,
        /// Actual size in bytes.
        actual: usize,
    },

    /// The primitive refused to encrypt.
    #[error("encryption failed: {message}")]
    Encryption {
        /// Description of the failure.
        message: String,
    },
}

impl CipherError {
    /// Creates a malformed blob error.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedBlob {
            message: message.into(),
        }
    }

    /// Creates a key unavailable error.
    pub fn key_unavailable(alias: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::KeyUnavailable {
            alias: alias.into(),
            reason: reason.into(),
        }
    }

    /// Creates an encryption failed error.
    pub fn encryption_failed(message: impl Into<String>) -> Self {
        Self::Encryption {
            message: message.into(),
        }
    }

    /// Creates an unknown version error from the raw tag.
    pub fn unknown_version(tag: Option<u16>) -> Self {
        Self::UnknownCipherVersion {
            tag: tag.map_or_else(|| "absent".to_string(), |v| v.to_string()),
        }
    }
}

/// Errors surfaced by the secure store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The preferences backend failed.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Encrypting or decrypting a value failed.
    #[error("cipher error: {0}")]
    Cipher(#[from] CipherError),

    /// The current backend could not be opened, even after one reset.
    #[error("initialization failed: {message}")]
    InitializationFailure {
        /// Description of the last failure.
        message: String,
    },

    /// The store failed to initialize earlier and refuses all operations.
    #[error("store unavailable: {reason}")]
    StoreUnavailable {
        /// The initialization failure that made the store unusable.
        reason: String,
    },

    /// A decrypted value was not valid UTF-8.
    #[error("value for '{key}' is not valid UTF-8")]
    InvalidUtf8 {
        /// Physical key of the entry.
        key: String,
    },
}

impl StoreError {
    /// Creates an initialization failure error.
    pub fn initialization(message: impl Into<String>) -> Self {
        Self::InitializationFailure {
            message: message.into(),
        }
    }

    /// Creates a store unavailable error.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::StoreUnavailable {
            reason: reason.into(),
        }
    }

    /// Returns `true` for failures of the store itself rather than of one
    /// operation; these are never converted by reset-on-error.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::InitializationFailure { .. } | Self::StoreUnavailable { .. }
        )
    }
}
