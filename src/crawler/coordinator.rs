//! Crawler coordinator - the page fetch stage
//!
//! This module contains the crawl loop that drains the page frontier:
//! - Reloading the state store and collecting Pending URLs each round
//! - Fetching a round over a bounded pool of workers
//! - Classifying discovered links and registering new pages
//! - Storing page bodies and recording redirects as aliases

use crate::crawler::{fetch_url, parse_html};
use crate::state::CrawlEntry;
use crate::storage::{ContentStore, StateStorage};
use crate::url::{strip_fragment, LinkClass, LinkRules};
use crate::FerryError;
use futures::{future, stream, StreamExt, TryStreamExt};
use reqwest::Client;
use std::sync::Arc;

/// Extension given to stored page bodies
pub const PAGE_EXTENSION: &str = ".html";

/// What happened to one Pending URL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageOutcome {
    /// Body stored, entry now Downloaded
    Downloaded,
    /// Redirected to a URL that was already tracked
    Aliased,
    /// Redirected away from the crawl origin, recorded as Ignored
    LeftOrigin,
    /// Recorded as Error
    Failed,
}

/// Totals for one run of the fetch stage
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrawlReport {
    pub rounds: usize,
    pub downloaded: usize,
    pub aliased: usize,
    pub left_origin: usize,
    pub failed: usize,
}

impl CrawlReport {
    fn record(&mut self, outcome: PageOutcome) {
        match outcome {
            PageOutcome::Downloaded => self.downloaded += 1,
            PageOutcome::Aliased => self.aliased += 1,
            PageOutcome::LeftOrigin => self.left_origin += 1,
            PageOutcome::Failed => self.failed += 1,
        }
    }

    pub fn processed(&self) -> usize {
        self.downloaded + self.aliased + self.left_origin + self.failed
    }
}

/// Main crawler coordinator structure
pub struct Coordinator {
    client: Client,
    pages: Arc<dyn StateStorage>,
    content: ContentStore,
    rules: LinkRules,
    max_workers: usize,
}

impl Coordinator {
    /// Creates a new coordinator instance
    ///
    /// # Arguments
    ///
    /// * `client` - Shared HTTP client
    /// * `pages` - Page state store
    /// * `content` - Content store receiving page bodies
    /// * `rules` - Link classification for the crawl origin
    /// * `max_workers` - Upper bound on concurrent fetches
    pub fn new(
        client: Client,
        pages: Arc<dyn StateStorage>,
        content: ContentStore,
        rules: LinkRules,
        max_workers: usize,
    ) -> Self {
        Self {
            client,
            pages,
            content,
            rules,
            max_workers: max_workers.max(1),
        }
    }

    /// Runs the fetch stage until no Pending page is left
    ///
    /// Each round reloads the store, takes every Pending URL and fetches
    /// them concurrently; links found during a round are picked up by the
    /// next one. The first fatal error aborts the stage.
    pub async fn run(&self) -> Result<CrawlReport, FerryError> {
        let mut report = CrawlReport::default();
        let start_time = std::time::Instant::now();

        loop {
            self.pages.load()?;
            let batch: Vec<String> = self
                .pages
                .pending()?
                .into_iter()
                .map(|(url, _)| url)
                .collect();

            if batch.is_empty() {
                tracing::info!("Frontier is empty, crawl complete");
                break;
            }

            report.rounds += 1;
            tracing::info!(
                "Round {}: fetching {} pending pages",
                report.rounds,
                batch.len()
            );
            if tracing::enabled!(tracing::Level::DEBUG) {
                let counts = self
                    .pages
                    .counts()?
                    .iter()
                    .map(|(status, count)| format!("{}={}", status, count))
                    .collect::<Vec<_>>()
                    .join(" ");
                tracing::debug!("Page store: {}", counts);
            }

            stream::iter(batch)
                .map(|url| self.process_url(url))
                .buffer_unordered(self.max_workers)
                .try_for_each(|outcome| {
                    report.record(outcome);
                    future::ready(Ok(()))
                })
                .await?;

            let elapsed = start_time.elapsed();
            tracing::info!(
                "Progress: {} pages processed, {:.2} pages/sec",
                report.processed(),
                report.processed() as f64 / elapsed.as_secs_f64().max(f64::EPSILON)
            );
        }

        tracing::info!(
            "Crawl finished: {} downloaded, {} aliased, {} off-site, {} failed in {} rounds",
            report.downloaded,
            report.aliased,
            report.left_origin,
            report.failed,
            report.rounds
        );
        Ok(report)
    }

    /// Processes one Pending URL, recording non-fatal failures on the entry
    async fn process_url(&self, url: String) -> Result<PageOutcome, FerryError> {
        tracing::debug!("Processing URL: {}", url);

        match self.fetch_and_store(&url).await {
            Ok(outcome) => Ok(outcome),
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                tracing::warn!("Failed to fetch {}: {}", url, e);
                self.pages.upsert(&url, CrawlEntry::error(e.to_string()))?;
                Ok(PageOutcome::Failed)
            }
        }
    }

    async fn fetch_and_store(&self, url: &str) -> Result<PageOutcome, FerryError> {
        let fetched = fetch_url(&self.client, url).await?;
        let final_url = strip_fragment(&fetched.final_url);
        let final_key = final_url.as_str();
        let redirected = final_key != url;

        if !self.rules.is_same_origin(&final_url) {
            tracing::info!("{} redirects off-site to {}, ignoring it", url, final_key);
            self.pages.upsert(url, CrawlEntry::ignored())?;
            return Ok(PageOutcome::LeftOrigin);
        }

        if redirected && self.pages.contains(final_key)? {
            tracing::debug!("{} redirects to known page {}", url, final_key);
            self.pages.alias(url, final_key)?;
            return Ok(PageOutcome::Aliased);
        }

        let page = parse_html(&fetched.body, &final_url);
        tracing::debug!(
            "Fetched {} ({})",
            final_key,
            page.title.as_deref().unwrap_or("untitled")
        );

        let discovered = self.classify_links(page.links);
        let registered = self.pages.register_many(discovered)?;
        if registered > 0 {
            tracing::debug!("Registered {} new URLs from {}", registered, final_key);
        }

        let stored = self.content.put(fetched.body.as_bytes(), PAGE_EXTENSION)?;
        self.pages.upsert(
            final_key,
            CrawlEntry::downloaded(stored.hash, stored.file_name, fetched.content_type),
        )?;

        if redirected {
            self.pages.alias(url, final_key)?;
        }

        Ok(PageOutcome::Downloaded)
    }

    /// Turns the links of a page into entries to register
    ///
    /// Ignored links keep their fragment; pages are keyed without it.
    fn classify_links(&self, links: Vec<url::Url>) -> Vec<(String, CrawlEntry)> {
        links
            .into_iter()
            .filter_map(|link| match self.rules.classify(&link) {
                LinkClass::Ignored => Some((link.to_string(), CrawlEntry::ignored())),
                LinkClass::Page => Some((strip_fragment(&link).to_string(), CrawlEntry::pending())),
                LinkClass::Asset | LinkClass::External => None,
            })
            .collect()
    }
}
