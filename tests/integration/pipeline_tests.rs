//! Integration tests for the full pipeline
//!
//! A small site with pages, an image and a document is crawled, its assets
//! downloaded, transformed to Markdown and validated.

use crate::common::{create_test_config, mount_bytes, mount_page, mount_redirect, snapshot_tree};
use site_ferry::config::{Config, RemapRule};
use site_ferry::state::EntryStatus;
use site_ferry::storage::{content_hash, StateStorage};
use site_ferry::Pipeline;
use std::fs;
use std::path::Path;
use tempfile::TempDir;
use wiremock::MockServer;

const LOGO: &[u8] = b"\x89PNG fake logo bytes";
const PLAN: &[u8] = b"%PDF-1.4 fake plan";

async fn mount_site(server: &MockServer) {
    mount_page(
        server,
        "/",
        r#"<html><head><title>Home</title></head><body>
            <nav><a href="/">Home</a><a href="/about/">About</a></nav>
            <main>
                <h1>Welcome</h1>
                <p><a href="/about/">About us</a> and the <a href="/2023/05/17/fair/">fair</a>.</p>
                <img src="/img/logo.png" alt="Logo">
                <p><a href="mailto:office@example.com">Write to us</a></p>
            </main>
        </body></html>"#,
    )
    .await;
    mount_page(
        server,
        "/about/",
        r#"<html><head><title>About</title></head><body>
            <main><h2>Team</h2><p><a href="/">Back home</a></p></main>
        </body></html>"#,
    )
    .await;
    mount_page(
        server,
        "/2023/05/17/fair/",
        r#"<html><head><title>Spring fair</title></head><body>
            <main>
                <h1>Spring fair</h1>
                <p>See the <a href="../../../../files/plan.pdf">plan</a>
                and <a href="/about/#team">the team</a>.</p>
            </main>
        </body></html>"#,
    )
    .await;
    mount_bytes(server, "/img/logo.png", LOGO, "image/png").await;
    mount_bytes(server, "/files/plan.pdf", PLAN, "application/pdf").await;
}

fn site_config(server: &MockServer, dir: &Path) -> Config {
    let mut config = create_test_config(server, dir);
    config.transform.ignored_selectors = vec!["nav".to_string()];
    config.transform.remap = vec![RemapRule {
        pattern: r"(\d{4})/(\d{2})/(\d{2})/(.*)".to_string(),
        replacement: "news/$1/$2/$1-$2-$3-$4".to_string(),
    }];
    config
}

#[tokio::test]
async fn test_full_run_produces_linked_markdown() {
    let mock_server = MockServer::start().await;
    mount_site(&mock_server).await;

    let dir = TempDir::new().expect("Failed to create temp dir");
    let pipeline =
        Pipeline::new(site_config(&mock_server, dir.path())).expect("Failed to create pipeline");

    let summary = pipeline.run_all().await.expect("Pipeline failed");
    assert_eq!(summary.crawl.downloaded, 3);
    assert_eq!(summary.assets_registered, 2);
    assert_eq!(summary.assets.downloaded, 2);
    assert_eq!(summary.transform.written, 3);
    assert_eq!(summary.transform.assets_copied, 2);
    assert!(
        summary.validation.is_success(),
        "Broken references: {:?}",
        summary.validation.failures
    );

    let logo_file = format!("{}.png", content_hash(LOGO));
    let plan_file = format!("{}.pdf", content_hash(PLAN));
    let logo_url = format!("{}/img/logo.png", mock_server.uri());
    let logo_entry = pipeline
        .assets()
        .get(&logo_url)
        .expect("Failed to read store")
        .expect("Logo is tracked");
    assert_eq!(logo_entry.status, EntryStatus::Downloaded);
    assert_eq!(logo_entry.stored_path.as_deref(), Some(logo_file.as_str()));

    let out = dir.path().join("transformed");
    let index = fs::read_to_string(out.join("index.md")).expect("index.md written");
    let home_hash = pipeline
        .pages()
        .get(&format!("{}/", mock_server.uri()))
        .expect("Failed to read store")
        .and_then(|entry| entry.content_hash)
        .expect("Home page has a hash");
    assert!(index.starts_with(&format!(
        "---\ntitle: Home\noriginal_url: {}/\nchecksum: {}\n---\n\n",
        mock_server.uri(),
        home_hash
    )));
    assert!(index.contains("# Welcome"));
    assert!(index.contains("[About us](about.md)"));
    assert!(index.contains("(news/2023/05/2023-05-17-fair.md)"));
    assert!(index.contains(&format!("![Logo](assets/{})", logo_file)));
    assert!(index.contains("mailto:office@example.com"));

    let fair = fs::read_to_string(out.join("news/2023/05/2023-05-17-fair.md"))
        .expect("remapped document written");
    assert!(fair.contains(&format!("(../../../assets/{})", plan_file)));
    assert!(fair.contains("(../../../about.md)"));

    assert!(out.join("about.md").exists());
    assert_eq!(
        fs::read(out.join("assets").join(&logo_file)).expect("logo copied"),
        LOGO
    );
}

#[tokio::test]
async fn test_second_run_is_byte_identical() {
    let mock_server = MockServer::start().await;
    mount_site(&mock_server).await;

    let dir = TempDir::new().expect("Failed to create temp dir");
    let config = site_config(&mock_server, dir.path());
    let out = dir.path().join("transformed");
    let site_map = dir.path().join("input/map.site.csv");
    let assets_map = dir.path().join("input/map.assets.csv");

    Pipeline::new(config.clone())
        .expect("Failed to create pipeline")
        .run_all()
        .await
        .expect("First run failed");
    let first_tree = snapshot_tree(&out);
    let first_site_map = fs::read(&site_map).expect("site map written");
    let first_assets_map = fs::read(&assets_map).expect("assets map written");

    let summary = Pipeline::new(config)
        .expect("Failed to reopen pipeline")
        .run_all()
        .await
        .expect("Second run failed");
    assert_eq!(summary.crawl.processed(), 0);
    assert_eq!(summary.assets_registered, 0);
    assert_eq!(summary.assets.downloaded, 0);

    assert_eq!(snapshot_tree(&out), first_tree);
    assert_eq!(fs::read(&site_map).expect("site map"), first_site_map);
    assert_eq!(fs::read(&assets_map).expect("assets map"), first_assets_map);
}

#[tokio::test]
async fn test_validation_reports_missing_image() {
    let mock_server = MockServer::start().await;
    mount_site(&mock_server).await;

    let dir = TempDir::new().expect("Failed to create temp dir");
    let pipeline =
        Pipeline::new(site_config(&mock_server, dir.path())).expect("Failed to create pipeline");
    pipeline.run_all().await.expect("Pipeline failed");

    let out = dir.path().join("transformed");
    let logo_file = format!("{}.png", content_hash(LOGO));
    fs::remove_file(out.join("assets").join(&logo_file)).expect("logo was copied");

    let report = pipeline.validate(None).expect("Validation ran");
    assert_eq!(report.documents, 3);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].document, out.join("index.md"));
    assert_eq!(report.failures[0].target, format!("assets/{}", logo_file));
}

#[tokio::test]
async fn test_off_site_redirect_leaves_home_page_intact() {
    let mock_server = MockServer::start().await;
    let foreign_server = MockServer::start().await;

    mount_page(
        &mock_server,
        "/",
        r#"<html><head><title>Home</title></head><body>
            <main><h1>Welcome</h1><a href="/out">Partner</a></main>
        </body></html>"#,
    )
    .await;
    mount_redirect(&mock_server, "/out", &format!("{}/", foreign_server.uri())).await;
    mount_page(
        &foreign_server,
        "/",
        r#"<html><head><title>Foreign</title></head><body>
            <main><p>Foreign page</p></main>
        </body></html>"#,
    )
    .await;

    let dir = TempDir::new().expect("Failed to create temp dir");
    let pipeline = Pipeline::new(create_test_config(&mock_server, dir.path()))
        .expect("Failed to create pipeline");
    let summary = pipeline.run_all().await.expect("Pipeline failed");

    assert_eq!(summary.crawl.downloaded, 1);
    assert_eq!(summary.crawl.left_origin, 1);
    assert_eq!(summary.transform.written, 1);

    let out_entry = pipeline
        .pages()
        .get(&format!("{}/out", mock_server.uri()))
        .expect("Failed to read store")
        .expect("Redirecting URL is tracked");
    assert_eq!(out_entry.status, EntryStatus::Ignored);
    assert!(pipeline
        .pages()
        .get(&format!("{}/", foreign_server.uri()))
        .expect("Failed to read store")
        .is_none());

    let index = fs::read_to_string(dir.path().join("transformed/index.md"))
        .expect("index.md written");
    assert!(index.contains("title: Home"));
    assert!(index.contains("# Welcome"));
    assert!(!index.contains("Foreign page"));
}
