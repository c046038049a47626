//! Command implementations for `tenderwatch-ingest`

pub mod cache;
pub mod config;
pub mod filter;
pub mod sync;
