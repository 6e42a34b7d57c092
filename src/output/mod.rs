//! Output module for the migrated site
//!
//! This module handles:
//! - Rewriting links of stored pages to the migrated tree
//! - Converting content to Markdown documents with a header block
//! - Validating local references in the generated tree
//! - Reporting state store statistics

mod markdown;
mod rewrite;
pub mod stats;
mod transform;
mod validate;

pub use markdown::{render_document, FrontMatter, MarkdownConverter};
pub use rewrite::{remove_elements, LinkMap, LinkTarget, PageRewriter, RewrittenHtml};
pub use stats::{load_statistics, print_statistics, CrawlStatistics};
pub use transform::{TransformReport, Transformer};
pub use validate::{extract_references, validate_dir, BrokenReference, ValidationReport};
