//! Integration tests for the fetch stage
//!
//! These tests use wiremock to serve a small site and check what the crawl
//! records in the page state file and the content store.

use crate::common::{create_test_config, mount_page, mount_redirect};
use site_ferry::state::EntryStatus;
use site_ferry::storage::StateStorage;
use site_ferry::Pipeline;
use tempfile::TempDir;
use wiremock::MockServer;

#[tokio::test]
async fn test_full_crawl_single_site() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_page(
        &mock_server,
        "/",
        r#"<html><head><title>Home</title></head><body>
            <a href="/page1">Page 1</a>
            <a href="page2#details">Page 2</a>
            <a href="https://elsewhere.example.org/">Elsewhere</a>
        </body></html>"#,
    )
    .await;
    mount_page(
        &mock_server,
        "/page1",
        r#"<html><body><a href="/page2">Again</a><a href="/">Home</a></body></html>"#,
    )
    .await;
    mount_page(&mock_server, "/page2", "<html><body>Content 2</body></html>").await;

    let dir = TempDir::new().expect("Failed to create temp dir");
    let config = create_test_config(&mock_server, dir.path());
    let pipeline = Pipeline::new(config).expect("Failed to create pipeline");

    let report = pipeline.crawl().await.expect("Crawl failed");
    assert_eq!(report.downloaded, 3);
    assert_eq!(report.failed, 0);

    let pages = pipeline.pages();
    for route in ["/", "/page1", "/page2"] {
        let entry = pages
            .get(&format!("{}{}", base_url, route))
            .expect("Failed to read store")
            .unwrap_or_else(|| panic!("{} was not recorded", route));
        assert_eq!(entry.status, EntryStatus::Downloaded);
        let stored = entry.stored_path.expect("Downloaded entry has a path");
        assert!(pipeline.content().path_of(&stored).exists());
    }

    assert!(pages
        .get("https://elsewhere.example.org/")
        .expect("Failed to read store")
        .is_none());
    assert!(pages
        .get(&format!("{}/page2#details", base_url))
        .expect("Failed to read store")
        .is_none());

    let csv = std::fs::read_to_string(dir.path().join("input/map.site.csv"))
        .expect("State file was written");
    assert!(csv.starts_with("#status-format=1\nurl,status,hash,path,mimetype,error\n"));
}

#[tokio::test]
async fn test_redirects_share_one_stored_copy() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_page(
        &mock_server,
        "/",
        r#"<html><body><a href="/old-a">A</a><a href="/old-b">B</a></body></html>"#,
    )
    .await;
    mount_redirect(&mock_server, "/old-a", "/target").await;
    mount_redirect(&mock_server, "/old-b", "/target").await;
    mount_page(&mock_server, "/target", "<html><body><main>Target</main></body></html>").await;

    let dir = TempDir::new().expect("Failed to create temp dir");
    let pipeline = Pipeline::new(create_test_config(&mock_server, dir.path()))
        .expect("Failed to create pipeline");
    pipeline.crawl().await.expect("Crawl failed");

    let pages = pipeline.pages();
    let get = |route: &str| {
        pages
            .get(&format!("{}{}", base_url, route))
            .expect("Failed to read store")
            .expect("URL is tracked")
    };

    let target = get("/target");
    let a = get("/old-a");
    let b = get("/old-b");
    assert_eq!(target.status, EntryStatus::Downloaded);
    assert_eq!(a.content_hash, target.content_hash);
    assert_eq!(b.content_hash, target.content_hash);
    assert_eq!(a.stored_path, target.stored_path);
    assert_eq!(b.stored_path, target.stored_path);

    let aliases = pages.aliases().expect("Failed to read aliases");
    assert_eq!(aliases.len(), 2);
    assert!(pages.pending().expect("Failed to query").is_empty());

    // Home page plus one copy of the target
    let stored_files = std::fs::read_dir(dir.path().join("input/assets"))
        .expect("Content store exists")
        .count();
    assert_eq!(stored_files, 2);
}

#[tokio::test]
async fn test_asset_extension_beats_ignore_pattern() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_page(
        &mock_server,
        "/",
        r#"<html><body>
            <a href="/wp-content/uploads/plan.pdf">Plan</a>
            <a href="/wp-content/listing">Listing</a>
            <a href="/wp-login.php?action=logout">Logout</a>
            <a href="/about">About</a>
        </body></html>"#,
    )
    .await;
    mount_page(&mock_server, "/about", "<html><body>About</body></html>").await;

    let dir = TempDir::new().expect("Failed to create temp dir");
    let mut config = create_test_config(&mock_server, dir.path());
    config.crawler.ignore_patterns = vec!["wp-content".to_string(), "logout".to_string()];
    let pipeline = Pipeline::new(config).expect("Failed to create pipeline");
    pipeline.crawl().await.expect("Crawl failed");

    let status = |route: &str| {
        pipeline
            .pages()
            .get(&format!("{}{}", base_url, route))
            .expect("Failed to read store")
            .map(|entry| entry.status)
    };

    assert_eq!(status("/wp-content/uploads/plan.pdf"), None);
    assert_eq!(status("/wp-content/listing"), Some(EntryStatus::Ignored));
    assert_eq!(status("/wp-login.php?action=logout"), Some(EntryStatus::Ignored));
    assert_eq!(status("/about"), Some(EntryStatus::Downloaded));
}

#[tokio::test]
async fn test_failures_are_recorded_and_sticky() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_page(
        &mock_server,
        "/",
        r#"<html><body><a href="/missing">Missing</a></body></html>"#,
    )
    .await;

    let dir = TempDir::new().expect("Failed to create temp dir");
    let config = create_test_config(&mock_server, dir.path());

    let pipeline = Pipeline::new(config.clone()).expect("Failed to create pipeline");
    let report = pipeline.crawl().await.expect("Crawl failed");
    assert_eq!(report.failed, 1);

    let missing = format!("{}/missing", base_url);
    let entry = pipeline
        .pages()
        .get(&missing)
        .expect("Failed to read store")
        .expect("URL is tracked");
    assert_eq!(entry.status, EntryStatus::Error);

    // Mount the page now; a rerun must not revisit the terminal entry
    mount_page(&mock_server, "/missing", "<html><body>Back</body></html>").await;
    let before = std::fs::read(dir.path().join("input/map.site.csv")).expect("State file");

    let rerun = Pipeline::new(config).expect("Failed to reopen pipeline");
    let report = rerun.crawl().await.expect("Rerun failed");
    assert_eq!(report.processed(), 0);

    let after = std::fs::read(dir.path().join("input/map.site.csv")).expect("State file");
    assert_eq!(before, after);
}
