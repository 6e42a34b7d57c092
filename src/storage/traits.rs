//! Storage traits and error types
//!
//! This module defines the trait interface for state store backends and
//! associated error types.

use crate::state::{CrawlEntry, EntryStatus};
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Unknown status '{value}' on row {row} of {file}")]
    UnknownStatus {
        file: String,
        row: u64,
        value: String,
    },

    #[error("{file} uses status format {version}, newer than this build reads")]
    UnsupportedFormat { file: String, version: u32 },

    #[error("URL is not tracked: {0}")]
    UnknownUrl(String),

    #[error("Alias {from} -> {to} would form a cycle")]
    AliasCycle { from: String, to: String },

    #[error("State store lock poisoned: {0}")]
    LockPoisoned(String),
}

impl StorageError {
    /// Returns true when the backing file could not be read or written
    pub fn is_persistence(&self) -> bool {
        !matches!(self, Self::UnknownUrl(_) | Self::AliasCycle { .. })
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for state store implementations
///
/// Every method takes `&self`: implementations guard their data with a
/// single lock so that concurrent workers can share one store, and every
/// mutating call has persisted its change before it returns.
pub trait StateStorage: Send + Sync {
    // ===== Persistence =====

    /// Replaces the in-memory state with the content of the backing file
    fn load(&self) -> StorageResult<()>;

    // ===== Reads =====

    /// Gets the entry for a URL, following an alias to its canonical entry
    fn get(&self, url: &str) -> StorageResult<Option<CrawlEntry>>;

    /// Returns true if the URL is tracked, either directly or as an alias
    fn contains(&self, url: &str) -> StorageResult<bool> {
        Ok(self.get(url)?.is_some())
    }

    /// Returns `(url, entry)` pairs matching the predicate in insertion order
    ///
    /// Alias keys are not returned; their canonical key is.
    fn query(
        &self,
        predicate: &dyn Fn(&CrawlEntry) -> bool,
    ) -> StorageResult<Vec<(String, CrawlEntry)>>;

    /// Returns every `(alias, canonical)` pair
    fn aliases(&self) -> StorageResult<Vec<(String, String)>>;

    /// Number of tracked URLs per status; aliases count under their
    /// canonical entry's status
    fn counts(&self) -> StorageResult<BTreeMap<EntryStatus, u64>>;

    /// Number of tracked URLs, aliases included
    fn len(&self) -> StorageResult<usize>;

    // ===== Writes =====

    /// Sets the entry for a URL unless it already holds a terminal entry
    ///
    /// # Returns
    ///
    /// `true` if the entry was written, `false` if an existing terminal
    /// entry was kept
    fn upsert(&self, url: &str, entry: CrawlEntry) -> StorageResult<bool>;

    /// Inserts the entry only if the URL is not tracked yet
    fn register(&self, url: &str, entry: CrawlEntry) -> StorageResult<bool>;

    /// Inserts every untracked URL and persists once
    ///
    /// # Returns
    ///
    /// The number of URLs inserted
    fn register_many(&self, entries: Vec<(String, CrawlEntry)>) -> StorageResult<usize>;

    /// Makes `from` an alias of `to`
    ///
    /// Lookups of `from` then see `to`'s current entry. This is the only
    /// operation allowed to replace a terminal entry.
    fn alias(&self, from: &str, to: &str) -> StorageResult<()>;

    // ===== Convenience =====

    /// Entries waiting to be processed
    fn pending(&self) -> StorageResult<Vec<(String, CrawlEntry)>> {
        self.query(&|entry| entry.is_pending())
    }

    /// Entries whose content is in the content store
    fn downloaded(&self) -> StorageResult<Vec<(String, CrawlEntry)>> {
        self.query(&|entry| entry.downloaded_path().is_some())
    }

    /// Registers the start URL when the store is empty
    fn seed(&self, url: &str) -> StorageResult<bool> {
        if self.len()? > 0 {
            return Ok(false);
        }
        self.register(url, CrawlEntry::pending())
    }
}
