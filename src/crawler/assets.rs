//! Asset discovery and download stages
//!
//! Discovery scans every stored page for media and document references and
//! registers them in the asset state store. Download drains the Pending
//! assets once over a bounded worker pool.

use crate::crawler::{extract_asset_references, fetch_asset};
use crate::state::CrawlEntry;
use crate::storage::{ContentStore, StateStorage};
use crate::url::{path_extension, strip_fragment, LinkRules};
use crate::FerryError;
use futures::{future, stream, StreamExt, TryStreamExt};
use reqwest::Client;
use std::sync::Arc;
use url::Url;

/// Registers every asset referenced by a downloaded page
///
/// Pages whose stored document cannot be read are logged and skipped. All
/// new asset URLs are registered as Pending with a single write.
///
/// # Returns
///
/// The number of newly registered assets
pub fn discover_assets(
    pages: &dyn StateStorage,
    assets: &dyn StateStorage,
    content: &ContentStore,
    rules: &LinkRules,
) -> Result<usize, FerryError> {
    let mut found = Vec::new();
    let downloaded = pages.downloaded()?;

    for (page_url, entry) in &downloaded {
        let Some(stored_path) = entry.downloaded_path() else {
            continue;
        };

        let html = match content.read_to_string(stored_path) {
            Ok(html) => html,
            Err(e) => {
                tracing::warn!("Cannot read stored page {} for {}: {}", stored_path, page_url, e);
                continue;
            }
        };

        let base_url = match Url::parse(page_url) {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!("Skipping page with invalid URL {}: {}", page_url, e);
                continue;
            }
        };

        found.extend(
            extract_asset_references(&html, &base_url)
                .into_iter()
                .filter(|reference| rules.asset_extension(reference).is_some())
                .map(|reference| (strip_fragment(&reference).to_string(), CrawlEntry::pending())),
        );
    }

    tracing::debug!(
        "Found {} asset references in {} pages",
        found.len(),
        downloaded.len()
    );

    let registered = assets.register_many(found)?;
    tracing::info!("Registered {} new assets", registered);
    Ok(registered)
}

/// Totals for one run of the asset download stage
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AssetReport {
    pub downloaded: usize,
    pub failed: usize,
}

/// Downloads Pending assets into the content store
pub struct AssetDownloader {
    client: Client,
    assets: Arc<dyn StateStorage>,
    content: ContentStore,
    max_workers: usize,
}

impl AssetDownloader {
    pub fn new(
        client: Client,
        assets: Arc<dyn StateStorage>,
        content: ContentStore,
        max_workers: usize,
    ) -> Self {
        Self {
            client,
            assets,
            content,
            max_workers: max_workers.max(1),
        }
    }

    /// Downloads every currently Pending asset once; failures are not retried
    pub async fn run(&self) -> Result<AssetReport, FerryError> {
        let batch: Vec<String> = self
            .assets
            .pending()?
            .into_iter()
            .map(|(url, _)| url)
            .collect();

        tracing::info!("Downloading {} pending assets", batch.len());

        let mut report = AssetReport::default();
        stream::iter(batch)
            .map(|url| self.process_asset(url))
            .buffer_unordered(self.max_workers)
            .try_for_each(|stored| {
                if stored {
                    report.downloaded += 1;
                } else {
                    report.failed += 1;
                }
                future::ready(Ok(()))
            })
            .await?;

        tracing::info!(
            "Asset download finished: {} downloaded, {} failed",
            report.downloaded,
            report.failed
        );
        Ok(report)
    }

    async fn process_asset(&self, url: String) -> Result<bool, FerryError> {
        match self.download(&url).await {
            Ok(()) => Ok(true),
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                tracing::warn!("Failed to download asset {}: {}", url, e);
                self.assets.upsert(&url, CrawlEntry::error(e.to_string()))?;
                Ok(false)
            }
        }
    }

    async fn download(&self, url: &str) -> Result<(), FerryError> {
        let extension = path_extension(&Url::parse(url)?);
        let fetched = fetch_asset(&self.client, url).await?;

        let stored = self
            .content
            .put_hashed(fetched.hash, &fetched.bytes, &extension)?;
        if !stored.newly_written {
            tracing::debug!("{} has the same content as {}", url, stored.file_name);
        }

        self.assets.upsert(
            url,
            CrawlEntry::downloaded(stored.hash, stored.file_name, fetched.content_type),
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CrawlerConfig;
    use crate::crawler::build_http_client;
    use crate::state::EntryStatus;
    use crate::storage::CsvStateStore;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn rules() -> LinkRules {
        LinkRules::from_config(&CrawlerConfig::with_start_url("https://example.com/")).unwrap()
    }

    #[test]
    fn test_discover_registers_assets_once() {
        let dir = TempDir::new().unwrap();
        let pages = CsvStateStore::open(&dir.path().join("map.site.csv")).unwrap();
        let assets = CsvStateStore::open(&dir.path().join("map.assets.csv")).unwrap();
        let content = ContentStore::open(&dir.path().join("content")).unwrap();

        let html = r#"
            <main>
                <img src="/img/Logo.PNG">
                <a href="/files/plan.pdf#page=2">Plan</a>
                <a href="/about/">About</a>
                <img src="https://cdn.example.org/pic.jpg">
            </main>
        "#;
        let stored = content.put(html.as_bytes(), ".html").unwrap();
        pages
            .upsert(
                "https://example.com/news/",
                CrawlEntry::downloaded(stored.hash, stored.file_name, "text/html"),
            )
            .unwrap();
        pages
            .upsert(
                "https://example.com/broken/",
                CrawlEntry::downloaded("0".repeat(64), "missing.html", "text/html"),
            )
            .unwrap();

        let registered = discover_assets(&pages, &assets, &content, &rules()).unwrap();
        assert_eq!(registered, 3);

        let urls: Vec<String> = assets.pending().unwrap().into_iter().map(|(u, _)| u).collect();
        assert_eq!(
            urls,
            vec![
                "https://example.com/img/Logo.PNG",
                "https://cdn.example.org/pic.jpg",
                "https://example.com/files/plan.pdf",
            ]
        );

        let again = discover_assets(&pages, &assets, &content, &rules()).unwrap();
        assert_eq!(again, 0);
    }

    #[tokio::test]
    async fn test_download_names_file_by_digest() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/img/photo.JPG"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("Content-Type", "image/jpeg")
                    .set_body_bytes(b"hello".to_vec()),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/img/missing.png"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let assets = Arc::new(CsvStateStore::open(&dir.path().join("map.assets.csv")).unwrap());
        let content = ContentStore::open(&dir.path().join("content")).unwrap();
        let photo = format!("{}/img/photo.JPG", server.uri());
        let missing = format!("{}/img/missing.png", server.uri());
        assets.register(&photo, CrawlEntry::pending()).unwrap();
        assets.register(&missing, CrawlEntry::pending()).unwrap();

        let client =
            build_http_client(&CrawlerConfig::with_start_url(&server.uri())).unwrap();
        let downloader = AssetDownloader::new(client, assets.clone(), content.clone(), 2);
        let report = downloader.run().await.unwrap();
        assert_eq!(report, AssetReport { downloaded: 1, failed: 1 });

        let entry = assets.get(&photo).unwrap().unwrap();
        assert_eq!(entry.status, EntryStatus::Downloaded);
        assert_eq!(
            entry.stored_path.as_deref(),
            Some("2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824.jpg")
        );
        assert_eq!(entry.mime_type.as_deref(), Some("image/jpeg"));
        assert!(content.path_of(entry.stored_path.as_deref().unwrap()).exists());

        let failed = assets.get(&missing).unwrap().unwrap();
        assert_eq!(failed.status, EntryStatus::Error);
    }

    #[tokio::test]
    async fn test_content_store_failure_aborts_download() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/img/photo.jpg"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"photo".to_vec()))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let assets = Arc::new(CsvStateStore::open(&dir.path().join("map.assets.csv")).unwrap());
        let content_dir = dir.path().join("content");
        let content = ContentStore::open(&content_dir).unwrap();
        std::fs::remove_dir(&content_dir).unwrap();
        std::fs::write(&content_dir, "not a directory").unwrap();

        let photo = format!("{}/img/photo.jpg", server.uri());
        assets.register(&photo, CrawlEntry::pending()).unwrap();

        let client =
            build_http_client(&CrawlerConfig::with_start_url(&server.uri())).unwrap();
        let result = AssetDownloader::new(client, assets.clone(), content, 2)
            .run()
            .await;

        assert!(matches!(result, Err(FerryError::Io(_))));
        assert_eq!(
            assets.get(&photo).unwrap().unwrap().status,
            EntryStatus::Pending
        );
    }
}
