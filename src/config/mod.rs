//! Configuration module for Site-Ferry
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use site_ferry::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("ferry.toml")).unwrap();
//! println!("Crawl will use {} workers", config.crawler.max_workers);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CrawlerConfig, LinkFix, RemapRule, StorageConfig, TransformConfig,
    DEFAULT_ASSET_EXTENSIONS,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};

pub(crate) use validation::compile_pattern;
