//! `tenderwatch-ingest cache` command implementation

use crate::config::IngestConfig;
use crate::store::FingerprintStore;
use anyhow::Result;

/// List stored checkpoints
pub async fn show(config: &IngestConfig) -> Result<()> {
    let store = FingerprintStore::load(&config.cache_file)?;

    if store.is_empty() {
        println!("{}: no checkpoints", store.path().display());
        return Ok(());
    }

    for (source, fingerprint) in store.iter() {
        println!("{}  {}", source, fingerprint);
    }
    println!("{}: {} checkpoint(s)", store.path().display(), store.len());
    Ok(())
}

/// Remove every checkpoint; the next sync starts from scratch
pub async fn clear(config: &IngestConfig) -> Result<()> {
    let mut store = FingerprintStore::new(&config.cache_file);
    store.clear()?;
    println!("{}: cache removed", config.cache_file.display());
    Ok(())
}
