//! Common types used across Tenderwatch

use crate::error::{Result, TenderwatchError};
use std::fmt;
use std::str::FromStr;

/// Length in bytes of a [`Fingerprint`].
pub const FINGERPRINT_LEN: usize = 16;

/// 128-bit MD5 digest of a record's exact byte content.
///
/// Two fingerprints are equal iff the hashed bytes were identical. The
/// textual form is 32 lowercase hex characters, which is also how
/// fingerprints are persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Fingerprint([u8; FINGERPRINT_LEN]);

impl Fingerprint {
    pub fn from_bytes(bytes: [u8; FINGERPRINT_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; FINGERPRINT_LEN] {
        &self.0
    }

    /// Hex-encoded form used in the checkpoint file
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse the hex-encoded form produced by [`Fingerprint::to_hex`]
    pub fn from_hex(value: &str) -> Result<Self> {
        let decoded = hex::decode(value)
            .map_err(|e| TenderwatchError::invalid_fingerprint(value, e.to_string()))?;
        let bytes: [u8; FINGERPRINT_LEN] = decoded.try_into().map_err(|v: Vec<u8>| {
            TenderwatchError::invalid_fingerprint(
                value,
                format!("expected {} bytes, got {}", FINGERPRINT_LEN, v.len()),
            )
        })?;
        Ok(Self(bytes))
    }
}

impl From<md5::Digest> for Fingerprint {
    fn from(digest: md5::Digest) -> Self {
        Self(digest.0)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for Fingerprint {
    type Err = TenderwatchError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_hex(s)
    }
}

/// Identifies one logical feed inside a shared checkpoint store.
///
/// It is the fingerprint of the canonical request identifier (the full
/// request URL), so the same feed polled repeatedly always maps to the same
/// key while different queries against the same host stay independent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SourceKey(Fingerprint);

impl SourceKey {
    pub fn from_url(url: &str) -> Self {
        Self(crate::checksum::fingerprint(url.as_bytes()))
    }

    pub fn from_fingerprint(fingerprint: Fingerprint) -> Self {
        Self(fingerprint)
    }

    pub fn fingerprint(&self) -> Fingerprint {
        self.0
    }
}

impl fmt::Display for SourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for SourceKey {
    type Err = TenderwatchError;

    fn from_str(s: &str) -> Result<Self> {
        Fingerprint::from_hex(s).map(Self)
    }
}
