//! Fingerprint utilities for recognising feed records by content

use crate::types::Fingerprint;

/// Compute the fingerprint of bytes
pub fn fingerprint(data: &[u8]) -> Fingerprint {
    md5::compute(data).into()
}

/// Check whether bytes hash to the expected fingerprint
pub fn matches_fingerprint(data: &[u8], expected: &Fingerprint) -> bool {
    fingerprint(data) == *expected
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_known_value() {
        // MD5 of "Hello, world!"
        assert_eq!(fingerprint(b"Hello, world!").to_hex(), "6cd3556deb0da54bca060b4c39479839");
    }

    #[test]
    fn test_fingerprint_empty() {
        assert_eq!(fingerprint(b"").to_hex(), "d41d8cd98f00b204e9800998ecf8427e");
    }

    #[test]
    fn test_matches_fingerprint() {
        let expected = fingerprint(b"test data");
        assert!(matches_fingerprint(b"test data", &expected));
        assert!(!matches_fingerprint(b"test data\n", &expected));
    }
}
