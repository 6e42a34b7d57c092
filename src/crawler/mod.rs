//! Crawler module for web page and asset fetching
//!
//! This module contains the network-facing stages of the pipeline:
//! - HTTP fetching with redirect handling and streamed downloads
//! - HTML parsing, link and asset reference extraction
//! - The page fetch loop (coordinator)
//! - Asset discovery and asset download

mod assets;
mod coordinator;
mod fetcher;
mod parser;

pub use assets::{discover_assets, AssetDownloader, AssetReport};
pub use coordinator::{Coordinator, CrawlReport, PageOutcome, PAGE_EXTENSION};
pub use fetcher::{build_http_client, fetch_asset, fetch_url, FetchResult, FetchedAsset, MAX_REDIRECTS};
pub use parser::{extract_asset_references, extract_title, parse_html, resolve_link, ParsedPage};
