//! Tenderwatch Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared types, utilities, and error handling for the Tenderwatch project.
//!
//! # Overview
//!
//! This crate provides common functionality used across all Tenderwatch workspace members:
//!
//! - **Error Handling**: Custom error types and result types
//! - **Checksums**: Content fingerprints used to recognise feed records
//! - **Types**: Shared domain types (`Fingerprint`, `SourceKey`)
//! - **Logging**: Tracing subscriber setup
//!
//! # Example
//!
//! ```no_run
//! use tenderwatch_common::{Result, types::SourceKey};
//! use tenderwatch_common::checksum::fingerprint;
//!
//! fn describe(url: &str, row: &[u8]) -> Result<()> {
//!     let source = SourceKey::from_url(url);
//!     let fp = fingerprint(row);
//!     tracing::info!(source = %source, fingerprint = %fp, "Newest row");
//!     Ok(())
//! }
//! ```

pub mod checksum;
pub mod error;
pub mod logging;
pub mod types;

// Re-export commonly used types
pub use error::{Result, TenderwatchError};
pub use types::{Fingerprint, SourceKey};
