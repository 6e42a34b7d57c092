//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `EntryStatus`: the closed set of states a tracked URL moves through
//! - `CrawlEntry`: a status plus the content hash, stored path, mime type or
//!   error message that go with it

mod entry;
mod entry_status;

// Re-export main types
pub use entry::CrawlEntry;
pub use entry_status::{EntryStatus, STATUS_FORMAT_VERSION};
