//! Stage orchestration
//!
//! A `Pipeline` owns everything the stages share: the configuration, one
//! HTTP client, the page and asset state stores and the content store.
//! Stages can be run one at a time or in sequence with `run_all`.

use crate::config::Config;
use crate::crawler::{
    build_http_client, discover_assets, AssetDownloader, AssetReport, Coordinator, CrawlReport,
};
use crate::output::{validate_dir, TransformReport, Transformer, ValidationReport};
use crate::storage::{ContentStore, CsvStateStore, StateStorage};
use crate::url::LinkRules;
use crate::{FerryError, Result};
use reqwest::Client;
use std::path::Path;
use std::sync::Arc;
use url::Url;

/// Reports of a full run, in stage order
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub crawl: CrawlReport,
    pub assets_registered: usize,
    pub assets: AssetReport,
    pub transform: TransformReport,
    pub validation: ValidationReport,
}

/// Shared state for all pipeline stages
pub struct Pipeline {
    config: Config,
    client: Client,
    rules: LinkRules,
    pages: Arc<CsvStateStore>,
    assets: Arc<CsvStateStore>,
    content: ContentStore,
}

impl Pipeline {
    /// Opens the state stores and content store named by the configuration
    pub fn new(config: Config) -> Result<Self> {
        let client = build_http_client(&config.crawler).map_err(|source| FerryError::Http {
            url: config.crawler.start_url.clone(),
            source,
        })?;
        let rules = LinkRules::from_config(&config.crawler)?;

        let pages = Arc::new(CsvStateStore::open(Path::new(&config.storage.site_map_path))?);
        let assets = Arc::new(CsvStateStore::open(Path::new(
            &config.storage.assets_map_path,
        ))?);
        let content = ContentStore::open(Path::new(&config.storage.content_dir))?;

        Ok(Self {
            config,
            client,
            rules,
            pages,
            assets,
            content,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn pages(&self) -> &CsvStateStore {
        &self.pages
    }

    pub fn assets(&self) -> &CsvStateStore {
        &self.assets
    }

    pub fn content(&self) -> &ContentStore {
        &self.content
    }

    /// Fetches every reachable page of the site
    ///
    /// The start URL is registered first when the page store is empty.
    pub async fn crawl(&self) -> Result<CrawlReport> {
        self.pages.load()?;
        let start = Url::parse(&self.config.crawler.start_url)?;
        if self.pages.seed(start.as_str())? {
            tracing::info!("Seeded page store with {}", start);
        }

        Coordinator::new(
            self.client.clone(),
            self.pages.clone(),
            self.content.clone(),
            self.rules.clone(),
            self.config.crawler.max_workers,
        )
        .run()
        .await
    }

    /// Registers the assets referenced by downloaded pages
    pub fn extract_assets(&self) -> Result<usize> {
        self.pages.load()?;
        self.assets.load()?;
        discover_assets(
            self.pages.as_ref(),
            self.assets.as_ref(),
            &self.content,
            &self.rules,
        )
    }

    /// Downloads every Pending asset
    pub async fn download_assets(&self) -> Result<AssetReport> {
        self.assets.load()?;
        AssetDownloader::new(
            self.client.clone(),
            self.assets.clone(),
            self.content.clone(),
            self.config.crawler.max_workers,
        )
        .run()
        .await
    }

    /// Writes the Markdown tree
    pub fn transform(&self) -> Result<TransformReport> {
        self.pages.load()?;
        self.assets.load()?;
        Transformer::new(&self.config.transform, &self.content)?
            .run(self.pages.as_ref(), self.assets.as_ref())
    }

    /// Checks the references of a Markdown tree, the output directory unless
    /// `dir` is given
    pub fn validate(&self, dir: Option<&Path>) -> Result<ValidationReport> {
        let root = dir.unwrap_or_else(|| Path::new(&self.config.transform.output_dir));
        Ok(validate_dir(root)?)
    }

    /// Runs all five stages in order
    pub async fn run_all(&self) -> Result<RunSummary> {
        tracing::info!("Stage 1/5: crawl");
        let crawl = self.crawl().await?;

        tracing::info!("Stage 2/5: extract assets");
        let assets_registered = self.extract_assets()?;

        tracing::info!("Stage 3/5: download assets");
        let assets = self.download_assets().await?;

        tracing::info!("Stage 4/5: transform");
        let transform = self.transform()?;

        tracing::info!("Stage 5/5: validate");
        let validation = self.validate(None)?;

        Ok(RunSummary {
            crawl,
            assets_registered,
            assets,
            transform,
            validation,
        })
    }
}
