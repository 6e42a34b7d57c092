//! Site-Ferry: a resumable site-to-Markdown migration pipeline
//!
//! This crate mirrors a live website into a content-addressed archive and
//! turns the archive into a link-consistent set of Markdown documents. The
//! work is split into sequential stages (crawl, asset discovery, asset
//! download, transform, validate) that share two CSV-backed state stores.

pub mod config;
pub mod crawler;
pub mod output;
pub mod pipeline;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for Site-Ferry operations
#[derive(Debug, Error)]
pub enum FerryError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTML parse error for {url}: {message}")]
    HtmlParse { url: String, message: String },

    #[error("Markdown conversion failed for {url}: {message}")]
    Markdown { url: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl FerryError {
    /// Returns true for errors that must abort the running stage
    ///
    /// A terminal entry must always have its backing file, so a failed
    /// state or content write is never recorded on an entry.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Storage(e) => e.is_persistence(),
            Self::Io(_) | Self::Config(_) => true,
            _ => false,
        }
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("Invalid selector '{0}'")]
    InvalidSelector(String),
}

/// Result type alias for Site-Ferry operations
pub type Result<T> = std::result::Result<T, FerryError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use pipeline::Pipeline;
pub use state::{CrawlEntry, EntryStatus};
pub use storage::{ContentStore, CsvStateStore, StateStorage};
