//! Storage module for crawl state and downloaded content
//!
//! This module provides:
//! - The `StateStorage` trait and its CSV implementation, one instance per
//!   tracked collection (pages, assets)
//! - The content-addressed `ContentStore` holding fetched pages and assets

mod content_store;
mod csv_store;
mod traits;

pub use content_store::{content_hash, ContentStore, StoredContent};
pub use csv_store::CsvStateStore;
pub use traits::{StateStorage, StorageError, StorageResult};
