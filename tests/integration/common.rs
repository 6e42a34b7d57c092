//! Shared helpers for integration tests

use site_ferry::config::{Config, CrawlerConfig, StorageConfig, TransformConfig};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration rooted in `dir` crawling `server`
pub fn create_test_config(server: &MockServer, dir: &Path) -> Config {
    let mut crawler = CrawlerConfig::with_start_url(&format!("{}/", server.uri()));
    crawler.max_workers = 4;
    crawler.request_timeout_secs = 5;
    crawler.user_agent = "TestBot/1.0".to_string();

    Config {
        crawler,
        storage: StorageConfig {
            site_map_path: path_string(&dir.join("input/map.site.csv")),
            assets_map_path: path_string(&dir.join("input/map.assets.csv")),
            content_dir: path_string(&dir.join("input/assets")),
        },
        transform: TransformConfig {
            output_dir: path_string(&dir.join("transformed")),
            ..TransformConfig::default()
        },
    }
}

fn path_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Mounts an HTML page
pub async fn mount_page(server: &MockServer, route: &str, html: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(html.to_string())
                .insert_header("content-type", "text/html; charset=utf-8"),
        )
        .mount(server)
        .await;
}

/// Mounts a binary file
pub async fn mount_bytes(server: &MockServer, route: &str, bytes: &[u8], content_type: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(bytes.to_vec())
                .insert_header("content-type", content_type),
        )
        .mount(server)
        .await;
}

/// Mounts a permanent redirect
pub async fn mount_redirect(server: &MockServer, route: &str, location: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(301).insert_header("location", location))
        .mount(server)
        .await;
}

/// Reads every file under `root`, keyed by its path relative to `root`
pub fn snapshot_tree(root: &Path) -> BTreeMap<PathBuf, Vec<u8>> {
    walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| {
            let rel = entry
                .path()
                .strip_prefix(root)
                .expect("entry is under root")
                .to_path_buf();
            let bytes = std::fs::read(entry.path()).expect("Failed to read output file");
            (rel, bytes)
        })
        .collect()
}
