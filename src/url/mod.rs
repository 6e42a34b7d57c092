//! URL handling module for Site-Ferry
//!
//! This module provides link classification against the crawl origin,
//! regex pattern sets, URL remapping and the output path arithmetic used by
//! the transform stage.

mod matcher;
mod paths;

use crate::config::CrawlerConfig;
use crate::ConfigResult;
use url::Url;

// Re-export main types and functions
pub use matcher::{LinkFixer, PatternSet, UrlRemapper};
pub use paths::{normalize_path, output_path_for, path_extension, relative_path, MARKUP_EXTENSION};

/// How a link found on a crawled page is handled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkClass {
    /// Different origin or non-HTTP scheme - dropped
    External,
    /// Asset extension - left for the asset stages
    Asset,
    /// Matches an ignore pattern - recorded but never fetched
    Ignored,
    /// Same-origin page - queued for fetching
    Page,
}

/// Compiled link classification rules for one crawl
#[derive(Debug, Clone)]
pub struct LinkRules {
    origin_host: Option<String>,
    origin_port: Option<u16>,
    asset_extensions: Vec<String>,
    ignore: PatternSet,
}

impl LinkRules {
    /// Compiles the rules from the crawler section of the configuration
    pub fn from_config(config: &CrawlerConfig) -> ConfigResult<Self> {
        let start = Url::parse(&config.start_url)
            .map_err(|e| crate::ConfigError::InvalidUrl(format!("{}: {}", config.start_url, e)))?;

        Ok(Self {
            origin_host: start.host_str().map(str::to_string),
            origin_port: start.port(),
            asset_extensions: config
                .asset_extensions
                .iter()
                .map(|ext| ext.to_lowercase())
                .collect(),
            ignore: PatternSet::compile(&config.ignore_patterns)?,
        })
    }

    /// Returns true for http(s) URLs on the start URL's host and port
    pub fn is_same_origin(&self, url: &Url) -> bool {
        matches!(url.scheme(), "http" | "https")
            && url.host_str().is_some()
            && url.host_str().map(str::to_string) == self.origin_host
            && url.port() == self.origin_port
    }

    /// Returns the lowercased extension if it is a configured asset extension
    pub fn asset_extension(&self, url: &Url) -> Option<String> {
        let ext = path_extension(url);
        if !ext.is_empty() && self.asset_extensions.contains(&ext) {
            Some(ext)
        } else {
            None
        }
    }

    pub fn is_ignored(&self, link: &str) -> bool {
        self.ignore.is_match(link)
    }

    /// Classifies a resolved link
    ///
    /// The checks run in this priority order:
    /// 1. External (other origin or scheme)
    /// 2. Asset extension
    /// 3. Ignore pattern, searched in the full link
    /// 4. Page (default)
    ///
    /// # Examples
    ///
    /// ```
    /// use site_ferry::config::CrawlerConfig;
    /// use site_ferry::url::{LinkClass, LinkRules};
    /// use url::Url;
    ///
    /// let mut config = CrawlerConfig::with_start_url("https://example.com/");
    /// config.ignore_patterns = vec!["/private/".to_string()];
    /// let rules = LinkRules::from_config(&config).unwrap();
    ///
    /// let classify = |s: &str| rules.classify(&Url::parse(s).unwrap());
    /// assert_eq!(classify("https://other.org/x"), LinkClass::External);
    /// assert_eq!(classify("https://example.com/private/a.pdf"), LinkClass::Asset);
    /// assert_eq!(classify("https://example.com/private/doc"), LinkClass::Ignored);
    /// assert_eq!(classify("https://example.com/about/"), LinkClass::Page);
    /// ```
    pub fn classify(&self, link: &Url) -> LinkClass {
        // Priority 1: origin
        if !self.is_same_origin(link) {
            return LinkClass::External;
        }

        // Priority 2: assets are handled by their own stages
        if self.asset_extension(link).is_some() {
            return LinkClass::Asset;
        }

        // Priority 3: ignore patterns
        if self.is_ignored(link.as_str()) {
            return LinkClass::Ignored;
        }

        LinkClass::Page
    }
}

/// Returns the URL without its fragment
///
/// ```
/// use site_ferry::url::strip_fragment;
/// use url::Url;
///
/// let url = Url::parse("https://example.com/page#section").unwrap();
/// assert_eq!(strip_fragment(&url).as_str(), "https://example.com/page");
/// ```
pub fn strip_fragment(url: &Url) -> Url {
    let mut url = url.clone();
    url.set_fragment(None);
    url
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules_for(start: &str, ignore: &[&str]) -> LinkRules {
        let mut config = CrawlerConfig::with_start_url(start);
        config.ignore_patterns = ignore.iter().map(|s| s.to_string()).collect();
        LinkRules::from_config(&config).unwrap()
    }

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_other_host_is_external() {
        let rules = rules_for("https://example.com/", &[]);
        assert_eq!(rules.classify(&url("https://cdn.example.com/")), LinkClass::External);
        assert_eq!(rules.classify(&url("mailto:someone@example.com")), LinkClass::External);
    }

    #[test]
    fn test_port_is_part_of_origin() {
        let rules = rules_for("http://127.0.0.1:8080/", &[]);
        assert_eq!(rules.classify(&url("http://127.0.0.1:8080/a")), LinkClass::Page);
        assert_eq!(rules.classify(&url("http://127.0.0.1:9090/a")), LinkClass::External);
    }

    #[test]
    fn test_scheme_may_differ() {
        let rules = rules_for("https://example.com/", &[]);
        assert_eq!(rules.classify(&url("http://example.com/a")), LinkClass::Page);
    }

    #[test]
    fn test_asset_extension_is_case_insensitive() {
        let rules = rules_for("https://example.com/", &[]);
        assert_eq!(
            rules.classify(&url("https://example.com/img/Photo.JPG")),
            LinkClass::Asset
        );
        assert_eq!(
            rules.asset_extension(&url("https://example.com/img/Photo.JPG")),
            Some(".jpg".to_string())
        );
    }

    #[test]
    fn test_priority_asset_over_ignore() {
        let rules = rules_for("https://example.com/", &["wp-content"]);
        assert_eq!(
            rules.classify(&url("https://example.com/wp-content/a.pdf")),
            LinkClass::Asset
        );
        assert_eq!(
            rules.classify(&url("https://example.com/wp-content/page")),
            LinkClass::Ignored
        );
    }

    #[test]
    fn test_ignore_sees_query_and_fragment() {
        let rules = rules_for("https://example.com/", &[r"\?s=", "#respond"]);
        assert_eq!(rules.classify(&url("https://example.com/?s=x")), LinkClass::Ignored);
        assert_eq!(
            rules.classify(&url("https://example.com/post/#respond")),
            LinkClass::Ignored
        );
    }
}
