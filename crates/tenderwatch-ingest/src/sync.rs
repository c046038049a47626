//! Feed synchronisation
//!
//! One poll of a newest-first feed:
//!
//! 1. Read the newest row and fingerprint it (line ending `\n` excluded).
//! 2. Same fingerprint as the stored checkpoint: nothing new.
//! 3. Otherwise parse the newest row, then stream the remaining rows through
//!    a [`ChunkScanningReader`] that stops at the previous checkpoint.
//! 4. Move the checkpoint to the newest row and persist it.
//!
//! The checkpoint moves only after the whole stream was read, so a failed
//! poll leaves it untouched and the next poll starts over from the same
//! point.

use crate::dates::format_rus_date;
use crate::order::Order;
use crate::parser::{strip_line_ending, OrderParser, ParseError};
use crate::scanner::{ChunkScanningReader, ScanError};
use crate::store::{lock_store, SharedStore};
use std::io::{self, BufRead, BufReader, Read};
use tenderwatch_common::checksum::fingerprint;
use tenderwatch_common::{SourceKey, TenderwatchError};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Rows are newline terminated
pub const ROW_DELIMITER: &[u8] = b"\n";

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Newest row is malformed: {0}")]
    NewestRow(#[source] ParseError),

    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error("Checkpoint store error: {0}")]
    Store(#[from] TenderwatchError),
}

/// Result of one poll
#[derive(Debug, Clone, PartialEq)]
pub enum SyncOutcome {
    /// The feed has no rows
    Empty,
    /// The newest row is the one seen last time
    Unchanged,
    /// New orders, newest first
    Updated(Vec<Order>),
}

impl SyncOutcome {
    pub fn orders(&self) -> &[Order] {
        match self {
            SyncOutcome::Updated(orders) => orders,
            SyncOutcome::Empty | SyncOutcome::Unchanged => &[],
        }
    }

    pub fn into_orders(self) -> Vec<Order> {
        match self {
            SyncOutcome::Updated(orders) => orders,
            SyncOutcome::Empty | SyncOutcome::Unchanged => Vec::new(),
        }
    }
}

/// Consume the header line; returns false when the stream was empty
pub fn skip_header<R: BufRead>(reader: &mut R) -> io::Result<bool> {
    let mut header = Vec::new();
    Ok(reader.read_until(b'\n', &mut header)? > 0)
}

/// Runs polls against a shared checkpoint store
#[derive(Debug, Clone)]
pub struct FeedSync {
    store: SharedStore,
    parser: OrderParser,
}

impl FeedSync {
    pub fn new(store: SharedStore, parser: OrderParser) -> Self {
        Self { store, parser }
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    /// Poll a complete feed body, header included
    pub fn sync_feed<R: Read>(&self, url: &str, body: R) -> Result<SyncOutcome, SyncError> {
        let mut reader = BufReader::new(body);
        if !skip_header(&mut reader)? {
            debug!(url, "Feed body is empty");
            return Ok(SyncOutcome::Empty);
        }
        self.sync(url, reader)
    }

    /// Poll a feed whose reader is positioned after the header
    pub fn sync<R: BufRead>(&self, url: &str, mut reader: R) -> Result<SyncOutcome, SyncError> {
        let source = SourceKey::from_url(url);

        let mut newest = Vec::new();
        if reader.read_until(b'\n', &mut newest)? == 0 {
            info!(url, "Feed has no rows");
            return Ok(SyncOutcome::Empty);
        }
        let newest_bytes = newest.strip_suffix(b"\n").unwrap_or(&newest);

        let previous = lock_store(&self.store)?.lookup(&source);
        if previous == Some(fingerprint(newest_bytes)) {
            info!(url, "No new orders");
            return Ok(SyncOutcome::Unchanged);
        }

        let newest_order = self.parser.parse_line(&newest).map_err(SyncError::NewestRow)?;
        debug!(
            url,
            order_id = %newest_order.order_id,
            published = %newest_order.pub_date.as_ref().map(format_rus_date).unwrap_or_default(),
            "Newest order"
        );
        let mut orders = vec![newest_order];

        let scanner = ChunkScanningReader::new(reader, ROW_DELIMITER, previous)?;
        let mut rows = BufReader::new(scanner);
        let mut line = Vec::new();
        let mut row_number = 1usize;
        let mut skipped = 0usize;
        loop {
            line.clear();
            if rows.read_until(b'\n', &mut line)? == 0 {
                break;
            }
            row_number += 1;
            if strip_line_ending(&line).is_empty() {
                continue;
            }
            match self.parser.parse_line(&line) {
                Ok(order) => orders.push(order),
                Err(e) => {
                    skipped += 1;
                    warn!(url, row = row_number, error = %e, "Skipping malformed row");
                },
            }
        }

        {
            let mut store = lock_store(&self.store)?;
            store.update(source, newest_bytes);
            if let Err(e) = store.persist() {
                warn!(url, error = %e, "Failed to persist checkpoint");
            }
        }

        info!(
            url,
            orders = orders.len(),
            skipped,
            first_poll = previous.is_none(),
            "Feed synchronised"
        );
        Ok(SyncOutcome::Updated(orders))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::encoding::TextEncoding;
    use crate::store::FingerprintStore;
    use std::io::Cursor;
    use tempfile::TempDir;

    const URL: &str = "http://zakupki.gov.ru/epz/order/orderCsvSettings/download.html?fz44=on";

    fn row(id: u32) -> String {
        format!(
            "44-ФЗ;№{id};Электронный аукцион;Заказ {id};;;100.00;RUB;;;Организация;01.03.2014;01.03.2014;Подача заявок;;01.03.2014;10.03.2014\n"
        )
    }

    fn feed_sync(dir: &TempDir) -> FeedSync {
        let store = FingerprintStore::new(dir.path().join("cache.json")).into_shared();
        FeedSync::new(store, OrderParser::new(TextEncoding::Utf8))
    }

    #[test]
    fn test_empty_after_header() {
        let dir = TempDir::new().unwrap();
        let sync = feed_sync(&dir);
        let outcome = sync.sync(URL, Cursor::new(Vec::new())).unwrap();
        assert_eq!(outcome, SyncOutcome::Empty);
    }

    #[test]
    fn test_header_only_feed_is_empty() {
        let dir = TempDir::new().unwrap();
        let sync = feed_sync(&dir);
        let outcome = sync.sync_feed(URL, "Закон;Номер\n".as_bytes()).unwrap();
        assert_eq!(outcome, SyncOutcome::Empty);
        assert!(lock_store(sync.store()).unwrap().is_empty());
    }

    #[test]
    fn test_malformed_newest_row_keeps_checkpoint() {
        let dir = TempDir::new().unwrap();
        let sync = feed_sync(&dir);
        let body = format!("broken;row\n{}", row(1));
        let err = sync.sync(URL, Cursor::new(body)).unwrap_err();
        assert!(matches!(err, SyncError::NewestRow(ParseError::ColumnCount { .. })));
        assert!(lock_store(sync.store()).unwrap().is_empty());
    }

    #[test]
    fn test_malformed_older_row_is_skipped() {
        let dir = TempDir::new().unwrap();
        let sync = feed_sync(&dir);
        let body = format!("{}bad\"row\n{}", row(3), row(1));
        let orders = sync.sync(URL, Cursor::new(body)).unwrap().into_orders();
        let ids: Vec<_> = orders.iter().map(|o| o.order_id.as_str()).collect();
        assert_eq!(ids, vec!["3", "1"]);
    }

    #[test]
    fn test_second_poll_returns_only_new_rows() {
        let dir = TempDir::new().unwrap();
        let sync = feed_sync(&dir);

        let first = format!("{}{}", row(2), row(1));
        assert_eq!(sync.sync(URL, Cursor::new(first)).unwrap().orders().len(), 2);

        let second = format!("{}{}{}", row(4), row(3), row(2));
        let orders = sync.sync(URL, Cursor::new(second)).unwrap().into_orders();
        let ids: Vec<_> = orders.iter().map(|o| o.order_id.as_str()).collect();
        assert_eq!(ids, vec!["4", "3"]);
    }

    #[test]
    fn test_checkpoint_is_persisted() {
        let dir = TempDir::new().unwrap();
        let sync = feed_sync(&dir);
        sync.sync(URL, Cursor::new(row(1))).unwrap();

        let reloaded = FingerprintStore::load(dir.path().join("cache.json")).unwrap();
        let newest = row(1);
        assert_eq!(
            reloaded.lookup(&SourceKey::from_url(URL)),
            Some(fingerprint(newest.trim_end_matches('\n').as_bytes()))
        );
    }
}
