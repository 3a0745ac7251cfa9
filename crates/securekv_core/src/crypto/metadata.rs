//! Persisted cipher metadata and the value envelope.
//!
//! Every value written to a preferences store is an envelope:
//!
//! ```text
//! magic "SKV1" (4) | scheme_version u16 LE | params_len u16 LE | params | blob
//! ```
//!
//! base64-encoded (standard alphabet) into the string value. The metadata
//! travels with the ciphertext so decryption needs nothing beyond the key
//! and the envelope.

use crate::error::{CipherError, CipherResult};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

/// Magic bytes opening every envelope.
pub const ENVELOPE_MAGIC: [u8; 4] = *b"SKV1";

/// Size of the fixed envelope header (magic, version, parameter length).
pub const ENVELOPE_HEADER_SIZE: usize = 8;

/// Known cipher schemes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CipherVersion {
    /// AES-256-CBC with PKCS#7 padding, unauthenticated. Decrypt only.
    V1 = 1,
    /// AES-256-GCM with a random 96-bit nonce.
    V2 = 2,
}

impl CipherVersion {
    /// Returns the persisted tag.
    #[must_use]
    pub const fn tag(self) -> u16 {
        self as u16
    }
}

impl TryFrom<u16> for CipherVersion {
    type Error = CipherError;

    fn try_from(tag: u16) -> CipherResult<Self> {
        match tag {
            1 => Ok(Self::V1),
            2 => Ok(Self::V2),
            other => Err(CipherError::unknown_version(Some(other))),
        }
    }
}

/// Scheme tag and parameters recorded alongside a ciphertext.
///
/// Written once with the value and never edited; re-encryption under a new
/// scheme writes a new envelope carrying new metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CipherMetadata {
    /// Raw scheme version tag.
    pub scheme_version: u16,
    /// Scheme-specific parameter descriptor.
    pub algorithm_parameters: Vec<u8>,
}

impl CipherMetadata {
    /// Creates metadata for `version` with the given parameter descriptor.
    #[must_use]
    pub fn new(version: CipherVersion, parameters: &[u8]) -> Self {
        Self {
            scheme_version: version.tag(),
            algorithm_parameters: parameters.to_vec(),
        }
    }
}

/// Metadata plus the scheme-specific ciphertext blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    /// How `blob` was produced.
    pub metadata: CipherMetadata,
    /// The ciphertext, laid out as its scheme defines.
    pub blob: Vec<u8>,
}

impl Envelope {
    /// Wraps `blob` with `metadata`.
    #[must_use]
    pub fn new(metadata: CipherMetadata, blob: Vec<u8>) -> Self {
        Self { metadata, blob }
    }

    /// Encodes the envelope to bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the parameter descriptor exceeds `u16::MAX` bytes.
    pub fn encode(&self) -> CipherResult<Vec<u8>> {
        let params = &self.metadata.algorithm_parameters;
        let params_len = u16::try_from(params.len())
            .map_err(|_| CipherError::malformed("cipher parameters too long"))?;

        let mut buf = Vec::with_capacity(ENVELOPE_HEADER_SIZE + params.len() + self.blob.len());
        buf.extend_from_slice(&ENVELOPE_MAGIC);
        buf.extend_from_slice(&self.metadata.scheme_version.to_le_bytes());
        buf.extend_from_slice(&params_len.to_le_bytes());
        buf.extend_from_slice(params);
        buf.extend_from_slice(&self.blob);
        Ok(buf)
    }

    /// Decodes an envelope from bytes.
    ///
    /// # Errors
    ///
    /// - [`CipherError::UnknownCipherVersion`] with an absent tag if the
    ///   magic is missing
    /// - [`CipherError::MalformedBlob`] if the header is truncated
    pub fn decode(data: &[u8]) -> CipherResult<Self> {
        if data.len() < ENVELOPE_MAGIC.len() || data[..4] != ENVELOPE_MAGIC {
            return Err(CipherError::unknown_version(None));
        }
        if data.len() < ENVELOPE_HEADER_SIZE {
            return Err(CipherError::malformed("envelope header truncated"));
        }

        let scheme_version = u16::from_le_bytes([data[4], data[5]]);
        let params_len = usize::from(u16::from_le_bytes([data[6], data[7]]));
        let params_end = ENVELOPE_HEADER_SIZE + params_len;
        if data.len() < params_end {
            return Err(CipherError::malformed(format!(
                "envelope parameters truncated: need {params_end} bytes, have {}",
                data.len()
            )));
        }

        Ok(Self {
            metadata: CipherMetadata {
                scheme_version,
                algorithm_parameters: data[ENVELOPE_HEADER_SIZE..params_end].to_vec(),
            },
            blob: data[params_end..].to_vec(),
        })
    }

    /// Encodes the envelope as the text stored in a preferences backend.
    ///
    /// # Errors
    ///
    /// See [`encode`](Self::encode).
    pub fn to_text(&self) -> CipherResult<String> {
        Ok(STANDARD.encode(self.encode()?))
    }

    /// Decodes an envelope from its stored text form.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::MalformedBlob`] if the text is not base64, or
    /// any error from [`decode`](Self::decode).
    pub fn from_text(text: &str) -> CipherResult<Self> {
        let raw = STANDARD
            .decode(text)
            .map_err(|e| CipherError::malformed(format!("invalid base64: {e}")))?;
        Self::decode(&raw)
    }
}
