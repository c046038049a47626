//! `tenderwatch-ingest sync` command implementation
//!
//! Polls every feed on its own blocking task. All tasks share one
//! checkpoint store; new orders are filtered and written as JSON lines.

use crate::cli::{FeedArg, FeedInput};
use crate::config::IngestConfig;
use crate::filter::Filter;
use crate::order::Order;
use crate::parser::OrderParser;
use crate::store::FingerprintStore;
use crate::sync::{FeedSync, SyncError, SyncOutcome};
use anyhow::{bail, Context, Result};
use std::fs::File;
use std::io::{self, Write};
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{error, info};

/// Totals over one run
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct SyncSummary {
    pub feeds: usize,
    pub failed: usize,
    pub unchanged: usize,
    pub orders: usize,
    pub filtered: usize,
}

/// Poll feeds and print new orders to stdout
pub async fn run(config: &IngestConfig, feeds: Vec<FeedArg>) -> Result<()> {
    let mut stdout = io::stdout();
    let summary = sync_feeds(config, feeds, &mut stdout).await?;

    info!(
        feeds = summary.feeds,
        unchanged = summary.unchanged,
        orders = summary.orders,
        filtered = summary.filtered,
        "Sync complete"
    );

    if summary.failed > 0 {
        bail!("{} of {} feed(s) failed", summary.failed, summary.feeds);
    }
    Ok(())
}

/// Poll feeds concurrently, writing surviving orders to `out`
pub async fn sync_feeds<W: Write>(
    config: &IngestConfig,
    feeds: Vec<FeedArg>,
    out: &mut W,
) -> Result<SyncSummary> {
    if feeds.iter().filter(|f| f.input == FeedInput::Stdin).count() > 1 {
        bail!("Only one feed can be read from stdin");
    }

    let store = FingerprintStore::load(&config.cache_file)
        .with_context(|| format!("Failed to load cache {}", config.cache_file.display()))?
        .into_shared();
    let filter = if config.filter_enabled {
        let filter = Filter::load(&config.filter_file)
            .with_context(|| format!("Failed to load filter {}", config.filter_file.display()))?;
        Some(Arc::new(filter))
    } else {
        None
    };
    let sync = FeedSync::new(store, OrderParser::new(config.encoding));

    let mut summary = SyncSummary {
        feeds: feeds.len(),
        ..Default::default()
    };

    let mut tasks = JoinSet::new();
    for feed in feeds {
        let sync = sync.clone();
        tasks.spawn_blocking(move || {
            let outcome = poll(&sync, &feed);
            (feed, outcome)
        });
    }

    while let Some(joined) = tasks.join_next().await {
        let (feed, outcome) = match joined {
            Ok(result) => result,
            Err(e) => {
                summary.failed += 1;
                error!(error = %e, "Sync task panicked");
                continue;
            },
        };
        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(e) => {
                summary.failed += 1;
                error!(url = %feed.url, error = %e, "Feed sync failed");
                continue;
            },
        };

        if outcome == SyncOutcome::Unchanged {
            summary.unchanged += 1;
        }
        let orders = outcome.into_orders();
        let received = orders.len();
        let (orders, removed) = match &filter {
            Some(filter) => filter.execute(orders),
            None => (orders, 0.0),
        };

        summary.orders += orders.len();
        summary.filtered += received - orders.len();
        info!(
            url = %feed.url,
            received,
            kept = orders.len(),
            removed = f64::from(removed),
            "Feed polled"
        );
        // The checkpoint has already moved past these orders.
        if let Err(e) = write_orders(out, &orders) {
            error!(url = %feed.url, lost = orders.len(), error = %e, "Failed to write orders");
            return Err(e.context(format!(
                "Failed to write {} order(s) from {}",
                orders.len(),
                feed.url
            )));
        }
    }

    Ok(summary)
}

fn poll(sync: &FeedSync, feed: &FeedArg) -> Result<SyncOutcome, SyncError> {
    match &feed.input {
        FeedInput::Stdin => sync.sync_feed(&feed.url, io::stdin().lock()),
        FeedInput::File(path) => sync.sync_feed(&feed.url, File::open(path)?),
    }
}

fn write_orders<W: Write>(out: &mut W, orders: &[Order]) -> Result<()> {
    for order in orders {
        serde_json::to_writer(&mut *out, order)?;
        writeln!(out)?;
    }
    out.flush()?;
    Ok(())
}
