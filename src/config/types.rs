use serde::Deserialize;

/// Extensions treated as downloadable assets rather than pages
pub const DEFAULT_ASSET_EXTENSIONS: &[&str] = &[
    ".jpg", ".jpeg", ".png", ".gif", ".svg", ".bmp", ".webp", ".ico", ".pdf", ".doc", ".docx",
    ".xls", ".xlsx", ".zip", ".tar", ".gz", ".ppt", ".pptx", ".mp4", ".mp3", ".avi", ".mov",
    ".wmv", ".flv", ".mkv", ".jpe", ".odt",
];

/// Main configuration structure for Site-Ferry
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub transform: TransformConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Seed URL; its host and port define the crawl origin
    #[serde(rename = "start-url")]
    pub start_url: String,

    /// Size of the per-stage worker pool
    #[serde(rename = "max-workers", default = "default_max_workers")]
    pub max_workers: usize,

    /// Per-request timeout in seconds
    #[serde(rename = "request-timeout-secs", default = "default_timeout")]
    pub request_timeout_secs: u64,

    /// User-Agent header sent with every request
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,

    /// Path suffixes that mark a link as an asset
    #[serde(rename = "asset-extensions", default = "default_asset_extensions")]
    pub asset_extensions: Vec<String>,

    /// Regexes; a matching page link is recorded as ignored
    #[serde(rename = "ignore-patterns", default)]
    pub ignore_patterns: Vec<String>,
}

/// Locations of the state files and the content store
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(rename = "site-map-path", default = "default_site_map_path")]
    pub site_map_path: String,

    #[serde(rename = "assets-map-path", default = "default_assets_map_path")]
    pub assets_map_path: String,

    /// Directory holding content-addressed pages and assets
    #[serde(rename = "content-dir", default = "default_content_dir")]
    pub content_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            site_map_path: default_site_map_path(),
            assets_map_path: default_assets_map_path(),
            content_dir: default_content_dir(),
        }
    }
}

/// Markdown generation configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TransformConfig {
    #[serde(rename = "output-dir", default = "default_output_dir")]
    pub output_dir: String,

    /// Asset directory, relative to `output-dir`
    #[serde(rename = "assets-dir", default = "default_assets_dir")]
    pub assets_dir: String,

    /// Selector of the primary content container
    #[serde(rename = "content-selector", default = "default_content_selector")]
    pub content_selector: String,

    /// Elements removed before conversion
    #[serde(rename = "ignored-selectors", default)]
    pub ignored_selectors: Vec<String>,

    /// Regexes; matching pages are not transformed
    #[serde(rename = "ignored-urls", default)]
    pub ignored_urls: Vec<String>,

    /// Wipe the output directory before transforming
    #[serde(rename = "clean-output", default = "default_true")]
    pub clean_output: bool,

    #[serde(default)]
    pub remap: Vec<RemapRule>,

    #[serde(rename = "broken-links", default)]
    pub broken_links: Vec<LinkFix>,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            assets_dir: default_assets_dir(),
            content_selector: default_content_selector(),
            ignored_selectors: Vec::new(),
            ignored_urls: Vec::new(),
            clean_output: true,
            remap: Vec::new(),
            broken_links: Vec::new(),
        }
    }
}

/// URL rewrite applied before computing an output path
#[derive(Debug, Clone, Deserialize)]
pub struct RemapRule {
    /// Regex searched in the full URL
    pub pattern: String,

    /// Replacement, `$1`-style capture references allowed
    pub replacement: String,
}

/// Literal substitution applied to links before they are resolved
#[derive(Debug, Clone, Deserialize)]
pub struct LinkFix {
    pub from: String,
    pub to: String,
}

impl CrawlerConfig {
    /// Builds a crawler section with defaults for everything but the seed
    pub fn with_start_url(start_url: &str) -> Self {
        Self {
            start_url: start_url.to_string(),
            max_workers: default_max_workers(),
            request_timeout_secs: default_timeout(),
            user_agent: default_user_agent(),
            asset_extensions: default_asset_extensions(),
            ignore_patterns: Vec::new(),
        }
    }
}

fn default_max_workers() -> usize {
    8
}

fn default_timeout() -> u64 {
    20
}

fn default_user_agent() -> String {
    "Crawler/1.0".to_string()
}

fn default_asset_extensions() -> Vec<String> {
    DEFAULT_ASSET_EXTENSIONS
        .iter()
        .map(|ext| ext.to_string())
        .collect()
}

fn default_site_map_path() -> String {
    "build/input/map.site.csv".to_string()
}

fn default_assets_map_path() -> String {
    "build/input/map.assets.csv".to_string()
}

fn default_content_dir() -> String {
    "build/input/assets".to_string()
}

fn default_output_dir() -> String {
    "build/transformed".to_string()
}

fn default_assets_dir() -> String {
    "assets".to_string()
}

fn default_content_selector() -> String {
    "main".to_string()
}

fn default_true() -> bool {
    true
}
