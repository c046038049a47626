//! Text decoding for feed fields
//!
//! The registry exports its CSV in Windows-1251. Tokenizing happens on raw
//! bytes (the delimiter and quote are ASCII in every supported encoding) and
//! fingerprints are computed on raw bytes too, so decoding is applied only to
//! the final field values.

use encoding_rs::{Encoding, UTF_8, WINDOWS_1251};
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Character encoding of the feed body
///
/// Serialized with the same names `Display` prints, so the config file and
/// `TENDERWATCH_ENCODING` accept the same spellings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum TextEncoding {
    #[default]
    #[serde(rename = "windows-1251", alias = "cp1251")]
    Windows1251,
    #[serde(rename = "utf-8", alias = "utf8")]
    Utf8,
}

impl TextEncoding {
    fn charset(self) -> &'static Encoding {
        match self {
            TextEncoding::Windows1251 => WINDOWS_1251,
            TextEncoding::Utf8 => UTF_8,
        }
    }

    /// Decode field bytes; invalid sequences become U+FFFD
    pub fn decode(self, bytes: &[u8]) -> String {
        let (text, had_errors) = self.charset().decode_without_bom_handling(bytes);
        if had_errors {
            trace!(encoding = %self, "Replaced malformed bytes while decoding");
        }
        text.into_owned()
    }
}

impl std::str::FromStr for TextEncoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "windows-1251" | "cp1251" => Ok(TextEncoding::Windows1251),
            "utf-8" | "utf8" => Ok(TextEncoding::Utf8),
            other => Err(format!("Unsupported encoding: {}", other)),
        }
    }
}

impl std::fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TextEncoding::Windows1251 => f.write_str("windows-1251"),
            TextEncoding::Utf8 => f.write_str("utf-8"),
        }
    }
}
