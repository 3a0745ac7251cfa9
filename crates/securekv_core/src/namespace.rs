//! Key namespacing.
//!
//! Several logical stores share one physical store by prefixing every
//! logical key with `<prefix>_`. Enumeration and bulk deletion only ever
//! look at physical keys carrying the configured prefix.

/// Separator placed between the prefix and the logical key.
pub const SEPARATOR: char = '_';

/// Maps logical keys to physical keys and back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPrefixCodec {
    scan_prefix: String,
}

impl KeyPrefixCodec {
    /// Creates a codec for `prefix`.
    #[must_use]
    pub fn new(prefix: &str) -> Self {
        Self {
            scan_prefix: format!("{prefix}{SEPARATOR}"),
        }
    }

    /// Returns the string every physical key of this store starts with.
    #[must_use]
    pub fn scan_prefix(&self) -> &str {
        &self.scan_prefix
    }

    /// Returns the physical key for `logical`.
    #[must_use]
    pub fn encode(&self, logical: &str) -> String {
        let mut physical = String::with_capacity(self.scan_prefix.len() + logical.len());
        physical.push_str(&self.scan_prefix);
        physical.push_str(logical);
        physical
    }

    /// Strips the prefix from `physical`, or returns `None` if the key
    /// belongs to another store.
    #[must_use]
    pub fn decode<'a>(&self, physical: &'a str) -> Option<&'a str> {
        physical.strip_prefix(self.scan_prefix.as_str())
    }

    /// Returns `true` if `physical` belongs to this store.
    #[must_use]
    pub fn owns(&self, physical: &str) -> bool {
        physical.starts_with(self.scan_prefix.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_decode() {
        let codec = KeyPrefixCodec::new("app");
        let physical = codec.encode("token");
        assert_eq!(physical, "app_token");
        assert_eq!(codec.decode(&physical), Some("token"));
    }

    #[test]
    fn foreign_keys_are_not_owned() {
        let a = KeyPrefixCodec::new("A");
        let b = KeyPrefixCodec::new("B");
        let key = b.encode("x");
        assert!(!a.owns(&key));
        assert_eq!(a.decode(&key), None);
    }

    #[test]
    fn longer_prefix_is_not_shadowed() {
        let short = KeyPrefixCodec::new("app");
        let long = KeyPrefixCodec::new("apple");
        assert!(!short.owns(&long.encode("k")));
    }

    #[test]
    fn empty_logical_key() {
        let codec = KeyPrefixCodec::new("p");
        assert_eq!(codec.decode(&codec.encode("")), Some(""));
    }
}
