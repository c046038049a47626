//! `tenderwatch-ingest config` command implementation

use crate::config::IngestConfig;
use anyhow::{Context, Result};
use std::path::Path;
use tracing::info;

/// Print the effective configuration as JSON
pub async fn show(config: &IngestConfig) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(config)?);
    Ok(())
}

/// Persist the effective configuration to `path`
pub async fn save(config: &IngestConfig, path: &Path) -> Result<()> {
    config
        .save(path)
        .with_context(|| format!("Failed to save config {}", path.display()))?;

    if config.is_default() {
        info!(path = %path.display(), "Configuration equals defaults, file removed");
        println!("{}: defaults, file removed", path.display());
    } else {
        info!(path = %path.display(), "Configuration saved");
        println!("{}: saved", path.display());
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::encoding::TextEncoding;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_save_then_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        let config = IngestConfig {
            encoding: TextEncoding::Utf8,
            ..Default::default()
        };

        save(&config, &path).await.unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("\"utf-8\""), "{}", content);
        assert_eq!(IngestConfig::load(&path).unwrap(), config);
    }

    #[tokio::test]
    async fn test_save_defaults_removes_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"filter_enabled": false}"#).unwrap();

        save(&IngestConfig::default(), &path).await.unwrap();
        assert!(!path.exists());
    }
}
