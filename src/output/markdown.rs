//! Markdown document generation
//!
//! This module converts a page's content container to Markdown and wraps it
//! with the metadata header every generated document starts with.

use htmd::options::{HeadingStyle, Options};
use htmd::HtmlToMarkdown;

/// Metadata written at the top of every document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontMatter {
    pub title: String,
    pub original_url: String,
    /// Hex digest of the stored source page
    pub checksum: String,
}

impl FrontMatter {
    /// Formats the header block, closing delimiter included
    pub fn render(&self) -> String {
        format!(
            "---\ntitle: {}\noriginal_url: {}\nchecksum: {}\n---",
            self.title, self.original_url, self.checksum
        )
    }
}

/// HTML to Markdown converter using ATX (`#`) headings
pub struct MarkdownConverter {
    inner: HtmlToMarkdown,
}

impl MarkdownConverter {
    pub fn new() -> Self {
        let inner = HtmlToMarkdown::builder()
            .options(Options {
                heading_style: HeadingStyle::Atx,
                ..Default::default()
            })
            .build();
        Self { inner }
    }

    pub fn convert(&self, html: &str) -> std::io::Result<String> {
        self.inner.convert(html)
    }
}

impl Default for MarkdownConverter {
    fn default() -> Self {
        Self::new()
    }
}

/// Assembles a complete document from its header and converted body
///
/// # Example
///
/// ```
/// use site_ferry::output::{render_document, FrontMatter};
///
/// let front = FrontMatter {
///     title: "About".to_string(),
///     original_url: "https://example.com/about/".to_string(),
///     checksum: "abc123".to_string(),
/// };
/// assert_eq!(
///     render_document(&front, "Hello"),
///     "---\ntitle: About\noriginal_url: https://example.com/about/\nchecksum: abc123\n---\n\nHello"
/// );
/// ```
pub fn render_document(front: &FrontMatter, body: &str) -> String {
    format!("{}\n\n{}", front.render(), body)
}
