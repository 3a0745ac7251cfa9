//! Cipher selection from persisted metadata.

use super::cipher::{Cipher, CipherV2, StorageCipher, V2_PARAMETERS};
use super::legacy::{LegacyCipherV1, V1_PARAMETERS};
use super::metadata::{CipherMetadata, CipherVersion};
use crate::error::{CipherError, CipherResult};

/// Maps persisted metadata to the cipher that produced the data.
///
/// The mapping is fixed: each version tag selects exactly one scheme, and
/// the parameters recorded with the data must be the ones that scheme uses.
/// [`CipherV2`] is the only scheme handed out for new writes.
#[derive(Debug, Clone, Copy, Default)]
pub struct CipherFactory;

impl CipherFactory {
    /// Resolves the cipher that wrote data carrying `metadata`.
    ///
    /// # Errors
    ///
    /// - [`CipherError::UnknownCipherVersion`] for an unrecognized tag
    /// - [`CipherError::UnsupportedParameters`] if the parameters do not
    ///   belong to the tagged scheme
    pub fn resolve(metadata: &CipherMetadata) -> CipherResult<Cipher> {
        let version = CipherVersion::try_from(metadata.scheme_version)?;
        let (cipher, expected) = match version {
            CipherVersion::V1 => (Cipher::Legacy(LegacyCipherV1), V1_PARAMETERS),
            CipherVersion::V2 => (Cipher::Current(CipherV2), V2_PARAMETERS),
        };

        if metadata.algorithm_parameters != expected {
            return Err(CipherError::UnsupportedParameters {
                version: version.tag(),
                parameters: String::from_utf8_lossy(&metadata.algorithm_parameters).into_owned(),
            });
        }
        Ok(cipher)
    }

    /// Returns the cipher used for every new write.
    #[must_use]
    pub const fn current() -> CipherV2 {
        CipherV2
    }

    /// Returns the metadata recorded with every new write.
    #[must_use]
    pub fn current_metadata() -> CipherMetadata {
        Self::current().metadata()
    }

    /// Returns `true` if `metadata` describes the current scheme.
    #[must_use]
    pub fn is_current(metadata: &CipherMetadata) -> bool {
        *metadata == Self::current_metadata()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_known_versions() {
        let v1 = CipherFactory::resolve(&CipherMetadata::new(CipherVersion::V1, V1_PARAMETERS))
            .unwrap();
        assert_eq!(v1.version(), CipherVersion::V1);

        let v2 = CipherFactory::resolve(&CipherFactory::current_metadata()).unwrap();
        assert_eq!(v2.version(), CipherVersion::V2);
    }

    #[test]
    fn unknown_version_is_rejected() {
        let metadata = CipherMetadata {
            scheme_version: 7,
            algorithm_parameters: V2_PARAMETERS.to_vec(),
        };
        assert!(matches!(
            CipherFactory::resolve(&metadata),
            Err(CipherError::UnknownCipherVersion { .. })
        ));
    }

    #[test]
    fn mismatched_parameters_are_rejected() {
        let metadata = CipherMetadata::new(CipherVersion::V1, V2_PARAMETERS);
        assert!(matches!(
            CipherFactory::resolve(&metadata),
            Err(CipherError::UnsupportedParameters { version: 1, .. })
        ));
    }

    #[test]
    fn current_is_v2() {
        assert_eq!(CipherFactory::current().version(), CipherVersion::V2);
        assert!(CipherFactory::is_current(&CipherFactory::current_metadata()));
        assert!(!CipherFactory::is_current(&CipherMetadata::new(
            CipherVersion::V1,
            V1_PARAMETERS
        )));
    }
}
