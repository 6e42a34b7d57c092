//! Link rewriting inside a page's content container
//!
//! Links to crawled pages become relative paths to their Markdown documents;
//! links to downloaded assets become relative paths into the output asset
//! directory. Anything else is left as written.

use crate::state::CrawlEntry;
use crate::storage::{StateStorage, StorageResult};
use crate::url::{output_path_for, relative_path, strip_fragment, LinkFixer, PatternSet, UrlRemapper};
use lol_html::errors::RewritingError;
use lol_html::html_content::Element;
use lol_html::{element, rewrite_str, ElementContentHandlers, HandlerResult, RewriteStrSettings, Selector};
use std::borrow::Cow;
use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use url::Url;

/// Where a link points once the site is migrated
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkTarget {
    /// A generated document, relative to the output root
    Page(PathBuf),
    /// A content store file name
    Asset(String),
}

/// URL lookup tables for one transform run
#[derive(Debug, Clone, Default)]
pub struct LinkMap {
    pages: HashMap<String, PathBuf>,
    assets: HashMap<String, String>,
    assets_dir: PathBuf,
}

impl LinkMap {
    /// Builds the page and asset tables from the state stores
    ///
    /// Every Downloaded page not matching `excluded` maps to its output path;
    /// aliases map to their canonical page's path. Downloaded assets map to
    /// their content store file name.
    ///
    /// Excluded pages get no document, so they are left out of the map and
    /// links pointing at them keep their original URL instead of becoming
    /// relative links to a file that is never written.
    pub fn build(
        pages: &dyn StateStorage,
        assets: &dyn StateStorage,
        remapper: &UrlRemapper,
        excluded: &PatternSet,
        assets_dir: &Path,
    ) -> StorageResult<Self> {
        let mut page_paths = HashMap::new();
        for (url, _) in pages.downloaded()? {
            if excluded.is_match(&url) {
                continue;
            }
            let path = output_path_for(&url, remapper);
            page_paths.insert(url, path);
        }

        for (alias, canonical) in pages.aliases()? {
            if let Some(path) = page_paths.get(&canonical).cloned() {
                page_paths.entry(alias).or_insert(path);
            }
        }

        let asset_files = assets
            .downloaded()?
            .into_iter()
            .filter_map(|(url, entry)| downloaded_file(&entry).map(|file| (url, file)))
            .collect();

        Ok(Self {
            pages: page_paths,
            assets: asset_files,
            assets_dir: assets_dir.to_path_buf(),
        })
    }

    /// Output path of a page, relative to the output root
    pub fn output_path(&self, url: &str) -> Option<&Path> {
        self.pages.get(url).map(PathBuf::as_path)
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn asset_count(&self) -> usize {
        self.assets.len()
    }

    /// Path of an asset file relative to the output root
    pub fn asset_path(&self, file_name: &str) -> PathBuf {
        self.assets_dir.join(file_name)
    }

    pub fn lookup(&self, key: &str) -> Option<LinkTarget> {
        if let Some(path) = self.pages.get(key) {
            return Some(LinkTarget::Page(path.clone()));
        }
        self.assets.get(key).cloned().map(LinkTarget::Asset)
    }

    /// Looks the link up as written, then resolved against the page URL
    /// without its fragment
    pub fn resolve(&self, link: &str, page_url: &Url) -> Option<LinkTarget> {
        if let Some(target) = self.lookup(link) {
            return Some(target);
        }

        let absolute = page_url.join(link).ok()?;
        self.lookup(strip_fragment(&absolute).as_str())
    }
}

fn downloaded_file(entry: &CrawlEntry) -> Option<String> {
    entry.downloaded_path().map(str::to_string)
}

/// Result of rewriting one content container
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RewrittenHtml {
    pub html: String,
    /// Content store files the document now links to
    pub assets: BTreeSet<String>,
}

/// Rewrites the links of one page
pub struct PageRewriter<'a> {
    pub map: &'a LinkMap,
    pub fixer: &'a LinkFixer,
    pub page_url: &'a Url,
    /// The document being written, relative to the output root
    pub doc_path: &'a Path,
}

impl PageRewriter<'_> {
    /// Computes the replacement for one attribute value, if any
    pub fn rewrite_link(&self, link: &str) -> Option<(String, Option<String>)> {
        let fixed = self.fixer.apply(link.trim());
        match self.map.resolve(&fixed, self.page_url)? {
            LinkTarget::Page(path) => Some((relative_path(self.doc_path, &path), None)),
            LinkTarget::Asset(file) => Some((
                relative_path(self.doc_path, &self.map.asset_path(&file)),
                Some(file),
            )),
        }
    }

    /// Rewrites `a[href]` and `img|audio|video|source[src]` in `html`
    pub fn rewrite(&self, html: &str) -> Result<RewrittenHtml, RewritingError> {
        let assets = RefCell::new(BTreeSet::new());

        let html = rewrite_str(
            html,
            RewriteStrSettings {
                element_content_handlers: vec![
                    element!("a[href]", |el| self.update_attribute(el, "href", &assets)),
                    element!("img[src]", |el| self.update_attribute(el, "src", &assets)),
                    element!("audio[src]", |el| self.update_attribute(el, "src", &assets)),
                    element!("video[src]", |el| self.update_attribute(el, "src", &assets)),
                    element!("source[src]", |el| self.update_attribute(el, "src", &assets)),
                ],
                ..RewriteStrSettings::default()
            },
        )?;

        Ok(RewrittenHtml {
            html,
            assets: assets.into_inner(),
        })
    }

    fn update_attribute(
        &self,
        el: &mut Element,
        attr: &str,
        assets: &RefCell<BTreeSet<String>>,
    ) -> HandlerResult {
        let Some(value) = el.get_attribute(attr) else {
            return Ok(());
        };

        if let Some((replacement, asset)) = self.rewrite_link(&value) {
            el.set_attribute(attr, &replacement)?;
            if let Some(file) = asset {
                assets.borrow_mut().insert(file);
            }
        }
        Ok(())
    }
}

/// Removes every element matching one of `selectors`
pub fn remove_elements(html: &str, selectors: &[Selector]) -> Result<String, RewritingError> {
    if selectors.is_empty() {
        return Ok(html.to_string());
    }

    let handlers: Vec<(Cow<'_, Selector>, ElementContentHandlers<'_>)> = selectors
        .iter()
        .map(|selector| remove_handler(selector))
        .collect();

    rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: handlers,
            ..RewriteStrSettings::default()
        },
    )
}

fn remove_handler(selector: &Selector) -> (Cow<'_, Selector>, ElementContentHandlers<'_>) {
    (
        Cow::Borrowed(selector),
        ElementContentHandlers::default().element(element_handler(|el| {
            el.remove();
            Ok(())
        })),
    )
}

/// Pins the closure signature expected by `ElementContentHandlers::element`
fn element_handler<'h, F>(handler: F) -> F
where
    F: FnMut(&mut Element<'_, '_>) -> HandlerResult + 'h,
{
    handler
}
