//! `tenderwatch-ingest filter` command implementation

use crate::config::IngestConfig;
use crate::filter::FilterDefinitions;
use anyhow::{bail, Result};
use tracing::{info, warn};

/// Report broken patterns; fails if any set needs repair
pub async fn verify(config: &IngestConfig) -> Result<()> {
    let definitions = FilterDefinitions::load(&config.filter_file)?;
    let issues = definitions.verify();

    if issues.is_empty() {
        println!("{}: all pattern sets are valid", config.filter_file.display());
        return Ok(());
    }

    for (set, issue) in &issues {
        println!("{}: {}", set, issue);
    }
    bail!(
        "{} pattern set(s) need repair; run `filter clear`",
        issues.len()
    )
}

/// Remove broken patterns and save the repaired file
pub async fn clear(config: &IngestConfig) -> Result<()> {
    let path = &config.filter_file;
    let mut definitions = FilterDefinitions::load(path)?;
    let removed = definitions.clear();

    if removed.is_empty() {
        println!("{}: nothing to remove", path.display());
        return Ok(());
    }

    for (set, issue) in &removed {
        warn!(set = %set, "Removed pattern: {}", issue);
    }
    definitions.save(path)?;
    info!(file = %path.display(), removed = removed.len(), "Filter repaired");
    println!("{}: removed {} pattern(s)", path.display(), removed.len());
    Ok(())
}
