//! Tenderwatch Ingest Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Incremental ingestion of the procurement registry's order export.
//!
//! # Overview
//!
//! The registry publishes orders as a newest-first `;`-separated feed. Each
//! poll returns only the orders published since the previous poll:
//!
//! - **Store**: per-feed checkpoint of the newest row seen (`store`)
//! - **Scanner**: reader that stops at the checkpointed row (`scanner`)
//! - **Parser**: row tokenizer and typed order decoding (`parser`, `order`)
//! - **Filter**: regex pattern sets that drop uninteresting orders (`filter`)
//! - **Sync**: one poll end to end (`sync`)
//!
//! # Example
//!
//! ```no_run
//! use tenderwatch_ingest::encoding::TextEncoding;
//! use tenderwatch_ingest::parser::OrderParser;
//! use tenderwatch_ingest::store::FingerprintStore;
//! use tenderwatch_ingest::sync::FeedSync;
//!
//! fn main() -> anyhow::Result<()> {
//!     let store = FingerprintStore::load("cache.json")?.into_shared();
//!     let sync = FeedSync::new(store, OrderParser::new(TextEncoding::Windows1251));
//!     let body = std::fs::File::open("orders.csv")?;
//!     let outcome = sync.sync_feed("http://zakupki.gov.ru/epz/order/orderCsvSettings/download.html", body)?;
//!     for order in outcome.orders() {
//!         println!("{} {}", order.order_id, order.order_name);
//!     }
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod commands;
pub mod config;
pub mod dates;
pub mod encoding;
pub mod filter;
pub mod order;
pub mod parser;
pub mod scanner;
pub mod store;
pub mod sync;

pub use order::Order;
pub use sync::{FeedSync, SyncError, SyncOutcome};
