//! Transform stage - stored pages to linked Markdown documents
//!
//! For every downloaded page this stage strips unwanted elements, keeps the
//! primary content container, rewrites its links to the migrated tree,
//! converts it to Markdown and writes the document with its header block.
//! Referenced assets are copied next to the documents.

use crate::config::TransformConfig;
use crate::crawler::extract_title;
use crate::output::markdown::{render_document, FrontMatter, MarkdownConverter};
use crate::output::rewrite::{remove_elements, LinkMap, PageRewriter};
use crate::state::CrawlEntry;
use crate::storage::{ContentStore, StateStorage};
use crate::url::{LinkFixer, PatternSet, UrlRemapper};
use crate::{ConfigError, FerryError};
use scraper::{Html, Selector};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use url::Url;

/// Totals for one run of the transform stage
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransformReport {
    /// Documents written
    pub written: usize,
    /// Pages matching an exclusion pattern
    pub excluded: usize,
    /// Pages without a content container
    pub skipped: usize,
    /// Pages that could not be read, rewritten or converted
    pub failed: usize,
    /// Distinct asset files copied into the output tree
    pub assets_copied: usize,
    /// Referenced asset files missing from the content store
    pub assets_missing: usize,
}

enum PageResult {
    Written,
    NoContainer,
}

/// Asset files handled so far, each copied or reported once
#[derive(Default)]
struct AssetCopies {
    copied: HashSet<String>,
    missing: HashSet<String>,
}

/// Compiled transform settings
pub struct Transformer<'a> {
    content: &'a ContentStore,
    output_dir: PathBuf,
    assets_dir: PathBuf,
    clean_output: bool,
    excluded: PatternSet,
    remapper: UrlRemapper,
    fixer: LinkFixer,
    content_selector: Selector,
    ignored_selectors: Vec<lol_html::Selector>,
    converter: MarkdownConverter,
}

impl<'a> Transformer<'a> {
    /// Compiles patterns and selectors from the transform configuration
    pub fn new(config: &TransformConfig, content: &'a ContentStore) -> Result<Self, ConfigError> {
        let content_selector = Selector::parse(&config.content_selector)
            .map_err(|_| ConfigError::InvalidSelector(config.content_selector.clone()))?;

        let ignored_selectors = config
            .ignored_selectors
            .iter()
            .map(|s| {
                s.parse::<lol_html::Selector>()
                    .map_err(|_| ConfigError::InvalidSelector(s.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            content,
            output_dir: PathBuf::from(&config.output_dir),
            assets_dir: PathBuf::from(&config.assets_dir),
            clean_output: config.clean_output,
            excluded: PatternSet::compile(&config.ignored_urls)?,
            remapper: UrlRemapper::compile(&config.remap)?,
            fixer: LinkFixer::new(&config.broken_links),
            content_selector,
            ignored_selectors,
            converter: MarkdownConverter::new(),
        })
    }

    /// Transforms every Downloaded page in insertion order
    ///
    /// Per-page problems are logged and counted; only failures to write the
    /// output tree abort the stage.
    pub fn run(
        &self,
        pages: &dyn StateStorage,
        assets: &dyn StateStorage,
    ) -> Result<TransformReport, FerryError> {
        let map = LinkMap::build(pages, assets, &self.remapper, &self.excluded, &self.assets_dir)?;
        tracing::info!(
            "Link map holds {} page URLs and {} assets",
            map.page_count(),
            map.asset_count()
        );

        self.prepare_output_dir()?;

        let mut report = TransformReport::default();
        let mut copies = AssetCopies::default();
        let mut written: HashSet<PathBuf> = HashSet::new();

        for (url, entry) in pages.downloaded()? {
            let Some(doc_path) = map.output_path(&url) else {
                tracing::debug!("Excluded from transform: {}", url);
                report.excluded += 1;
                continue;
            };

            if !written.insert(doc_path.to_path_buf()) {
                tracing::warn!("{} overwrites an earlier page at {}", url, doc_path.display());
            }

            match self.transform_page(&url, &entry, doc_path, &map, &mut copies) {
                Ok(PageResult::Written) => report.written += 1,
                Ok(PageResult::NoContainer) => report.skipped += 1,
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    tracing::warn!("Failed to transform {}: {}", url, e);
                    report.failed += 1;
                }
            }
        }

        report.assets_copied = copies.copied.len();
        report.assets_missing = copies.missing.len();
        tracing::info!(
            "Transform finished: {} written, {} excluded, {} without content, {} failed, {} assets copied",
            report.written,
            report.excluded,
            report.skipped,
            report.failed,
            report.assets_copied
        );
        if report.assets_missing > 0 {
            tracing::warn!(
                "{} referenced assets were missing from the content store",
                report.assets_missing
            );
        }
        Ok(report)
    }

    fn prepare_output_dir(&self) -> std::io::Result<()> {
        if self.clean_output && self.output_dir.exists() {
            tracing::info!("Cleaning output directory {}", self.output_dir.display());
            fs::remove_dir_all(&self.output_dir)?;
        }
        fs::create_dir_all(&self.output_dir)
    }

    fn transform_page(
        &self,
        url: &str,
        entry: &CrawlEntry,
        doc_path: &Path,
        map: &LinkMap,
        copies: &mut AssetCopies,
    ) -> Result<PageResult, FerryError> {
        let html = self.read_page(url, entry)?;
        let page_url = Url::parse(url)?;

        let cleaned = remove_elements(&html, &self.ignored_selectors).map_err(|e| {
            FerryError::HtmlParse {
                url: url.to_string(),
                message: e.to_string(),
            }
        })?;

        let document = Html::parse_document(&cleaned);
        let title = extract_title(&document).unwrap_or_default();

        let Some(container) = document.select(&self.content_selector).next() else {
            tracing::info!("No content container in {}, skipping", url);
            return Ok(PageResult::NoContainer);
        };

        let rewriter = PageRewriter {
            map,
            fixer: &self.fixer,
            page_url: &page_url,
            doc_path,
        };
        let rewritten = rewriter
            .rewrite(&container.html())
            .map_err(|e| FerryError::HtmlParse {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        let body = self
            .converter
            .convert(&rewritten.html)
            .map_err(|e| FerryError::Markdown {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        let assets_out = self.output_dir.join(&self.assets_dir);
        for file in rewritten.assets {
            if copies.copied.contains(&file) || copies.missing.contains(&file) {
                continue;
            }
            // Only writes into the output tree are fatal
            match self.content.read(&file) {
                Ok(bytes) => {
                    fs::create_dir_all(&assets_out)?;
                    fs::write(assets_out.join(&file), bytes)?;
                    copies.copied.insert(file);
                }
                Err(e) => {
                    tracing::warn!("Cannot copy asset {} referenced by {}: {}", file, url, e);
                    copies.missing.insert(file);
                }
            }
        }

        let front = FrontMatter {
            title,
            original_url: url.to_string(),
            checksum: entry.content_hash.clone().unwrap_or_default(),
        };

        let out_path = self.output_dir.join(doc_path);
        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&out_path, render_document(&front, &body))?;
        tracing::debug!("Wrote {}", out_path.display());

        Ok(PageResult::Written)
    }

    /// Reads a stored page; a missing file is a per-page failure
    fn read_page(&self, url: &str, entry: &CrawlEntry) -> Result<String, FerryError> {
        let stored = entry.downloaded_path().unwrap_or_default();
        self.content
            .read_to_string(stored)
            .map_err(|e| FerryError::HtmlParse {
                url: url.to_string(),
                message: format!("cannot read stored page {}: {}", stored, e),
            })
    }
}
