//! Configuration for the ingest service
//!
//! Read from a JSON file (absent file means defaults), then overridden by
//! `TENDERWATCH_*` environment variables.

use crate::encoding::TextEncoding;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tenderwatch_common::{Result, TenderwatchError};

// ============================================================================
// Configuration Constants
// ============================================================================

pub const DEFAULT_CONFIG_FILE: &str = "config.json";
pub const DEFAULT_CACHE_FILE: &str = "cache.json";
pub const DEFAULT_FILTER_FILE: &str = "filter.json";

const ENV_CACHE_FILE: &str = "TENDERWATCH_CACHE_FILE";
const ENV_FILTER_FILE: &str = "TENDERWATCH_FILTER_FILE";
const ENV_FILTER_ENABLED: &str = "TENDERWATCH_FILTER_ENABLED";
const ENV_ENCODING: &str = "TENDERWATCH_ENCODING";

/// Ingest settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IngestConfig {
    /// Checkpoint store file
    pub cache_file: PathBuf,

    /// Filter pattern file
    pub filter_file: PathBuf,

    /// Apply the filter to synced orders
    pub filter_enabled: bool,

    /// Encoding of feed bodies
    pub encoding: TextEncoding,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            cache_file: PathBuf::from(DEFAULT_CACHE_FILE),
            filter_file: PathBuf::from(DEFAULT_FILTER_FILE),
            filter_enabled: true,
            encoding: TextEncoding::default(),
        }
    }
}

impl IngestConfig {
    /// Load from `path`, falling back to defaults when it does not exist
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(content) if content.trim().is_empty() => Ok(Self::default()),
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    /// Load from `path`, apply environment overrides and validate
    pub fn from_file_and_env(path: impl AsRef<Path>) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.merge_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `TENDERWATCH_*` environment overrides
    pub fn merge_env(&mut self) -> Result<()> {
        if let Ok(path) = std::env::var(ENV_CACHE_FILE) {
            self.cache_file = PathBuf::from(path);
        }

        if let Ok(path) = std::env::var(ENV_FILTER_FILE) {
            self.filter_file = PathBuf::from(path);
        }

        if let Ok(enabled) = std::env::var(ENV_FILTER_ENABLED) {
            self.filter_enabled = parse_bool(&enabled).ok_or_else(|| {
                TenderwatchError::config(format!(
                    "{} must be true or false, got '{}'",
                    ENV_FILTER_ENABLED, enabled
                ))
            })?;
        }

        if let Ok(encoding) = std::env::var(ENV_ENCODING) {
            self.encoding = encoding.parse().map_err(TenderwatchError::config)?;
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.cache_file.as_os_str().is_empty() {
            return Err(TenderwatchError::config("cache_file must not be empty"));
        }
        if self.filter_file.as_os_str().is_empty() {
            return Err(TenderwatchError::config("filter_file must not be empty"));
        }
        Ok(())
    }

    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }

    /// Save to `path`; a config equal to the defaults removes the file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if self.is_default() {
            return match std::fs::remove_file(path) {
                Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
                _ => Ok(()),
            };
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    fn clear_env() {
        for var in [ENV_CACHE_FILE, ENV_FILTER_FILE, ENV_FILTER_ENABLED, ENV_ENCODING] {
            std::env::remove_var(var);
        }
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = IngestConfig::load(dir.path().join("config.json")).unwrap();
        assert!(config.is_default());
        assert_eq!(config.cache_file, PathBuf::from(DEFAULT_CACHE_FILE));
        assert!(config.filter_enabled);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"filter_enabled": false, "encoding": "utf-8"}"#).unwrap();

        let config = IngestConfig::load(&path).unwrap();
        assert!(!config.filter_enabled);
        assert_eq!(config.encoding, TextEncoding::Utf8);
        assert_eq!(config.filter_file, PathBuf::from(DEFAULT_FILTER_FILE));
    }

    #[test]
    fn test_file_accepts_env_encoding_names() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        for name in ["windows-1251", "cp1251", "utf-8", "utf8"] {
            std::fs::write(&path, format!(r#"{{"encoding": "{}"}}"#, name)).unwrap();
            let config = IngestConfig::load(&path).unwrap();
            assert_eq!(config.encoding, name.parse::<TextEncoding>().unwrap());
        }
    }

    #[test]
    fn test_unknown_keys_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"host": "localhost"}"#).unwrap();
        assert!(IngestConfig::load(&path).is_err());
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        clear_env();
        std::env::set_var(ENV_CACHE_FILE, "/var/lib/tenderwatch/cache.json");
        std::env::set_var(ENV_FILTER_ENABLED, "off");
        std::env::set_var(ENV_ENCODING, "utf8");

        let mut config = IngestConfig::default();
        config.merge_env().unwrap();
        clear_env();

        assert_eq!(config.cache_file, PathBuf::from("/var/lib/tenderwatch/cache.json"));
        assert!(!config.filter_enabled);
        assert_eq!(config.encoding, TextEncoding::Utf8);
    }

    #[test]
    #[serial]
    fn test_env_bad_bool_is_error() {
        clear_env();
        std::env::set_var(ENV_FILTER_ENABLED, "maybe");
        let result = IngestConfig::default().merge_env();
        clear_env();

        assert!(matches!(result, Err(TenderwatchError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_empty_paths() {
        let config = IngestConfig {
            cache_file: PathBuf::new(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
        assert!(IngestConfig::default().validate().is_ok());
    }

    #[test]
    fn test_save_default_removes_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");

        let custom = IngestConfig {
            filter_enabled: false,
            ..Default::default()
        };
        custom.save(&path).unwrap();
        assert_eq!(IngestConfig::load(&path).unwrap(), custom);

        IngestConfig::default().save(&path).unwrap();
        assert!(!path.exists());
    }
}
