//! HTML parser for extracting links and metadata
//!
//! This module handles parsing HTML content to extract:
//! - Links to follow (from `<a>` tags)
//! - Asset references (`img`, `video`, `audio`, `source` and `a`)
//! - Page title

use scraper::{Html, Selector};
use url::Url;

/// Elements and attributes that may reference a downloadable asset
const ASSET_REFERENCES: &[(&str, &str)] = &[
    ("img[src]", "src"),
    ("video[src]", "src"),
    ("audio[src]", "src"),
    ("source[src]", "src"),
    ("a[href]", "href"),
];

/// Extracted information from an HTML page
#[derive(Debug, Clone)]
pub struct ParsedPage {
    /// The page title (from <title> tag)
    pub title: Option<String>,

    /// Every `<a href>` on the page, resolved, fragments kept
    pub links: Vec<Url>,
}

/// Parses HTML content and extracts links and metadata
///
/// # Link Extraction Rules
///
/// **Include:**
/// - `<a href="...">` anywhere in the document
///
/// **Exclude:**
/// - `javascript:`, `mailto:`, `tel:` links
/// - Data URIs
/// - Anything that is not HTTP(S) after resolution
///
/// Fragments are kept so ignore patterns can see them; the caller strips
/// them before queueing.
///
/// # Example
///
/// ```
/// use site_ferry::crawler::parse_html;
/// use url::Url;
///
/// let html = r#"<html><head><title>Test</title></head><body><a href="/page">Link</a></body></html>"#;
/// let base_url = Url::parse("https://example.com/").unwrap();
/// let parsed = parse_html(html, &base_url);
/// assert_eq!(parsed.title, Some("Test".to_string()));
/// assert_eq!(parsed.links[0].as_str(), "https://example.com/page");
/// ```
pub fn parse_html(html: &str, base_url: &Url) -> ParsedPage {
    let document = Html::parse_document(html);

    ParsedPage {
        title: extract_title(&document),
        links: select_urls(&document, "a[href]", "href", base_url),
    }
}

/// Extracts the page title from the HTML document
pub fn extract_title(document: &Html) -> Option<String> {
    let title_selector = Selector::parse("title").ok()?;

    document
        .select(&title_selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Collects every URL an asset could be referenced by
///
/// Results are resolved against `base_url` and kept in document order per
/// element kind; filtering by extension is left to the caller.
pub fn extract_asset_references(html: &str, base_url: &Url) -> Vec<Url> {
    let document = Html::parse_document(html);

    ASSET_REFERENCES
        .iter()
        .flat_map(|(selector, attr)| select_urls(&document, selector, attr, base_url))
        .collect()
}

fn select_urls(document: &Html, selector: &str, attr: &str, base_url: &Url) -> Vec<Url> {
    let Ok(selector) = Selector::parse(selector) else {
        return Vec::new();
    };

    document
        .select(&selector)
        .filter_map(|element| element.value().attr(attr))
        .filter_map(|value| resolve_link(value, base_url))
        .collect()
}

/// Resolves a link href to an absolute URL and validates it
///
/// Returns None if the link should be excluded:
/// - javascript:, mailto:, tel: schemes
/// - data: URIs
/// - Invalid URLs
/// - Non-HTTP(S) URLs after resolution
pub fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() {
        return None;
    }

    // Skip special schemes
    let lower = href.to_ascii_lowercase();
    if lower.starts_with("javascript:")
        || lower.starts_with("mailto:")
        || lower.starts_with("tel:")
        || lower.starts_with("data:")
    {
        return None;
    }

    match base_url.join(href) {
        Ok(absolute_url) => {
            // Only accept HTTP and HTTPS URLs
            if absolute_url.scheme() == "http" || absolute_url.scheme() == "https" {
                Some(absolute_url)
            } else {
                None
            }
        }
        Err(_) => None,
    }
}
