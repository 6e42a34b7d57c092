//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building the shared HTTP client (user agent, timeout, redirects)
//! - GET requests for pages, decoded as text
//! - Streamed GET requests for assets, hashed while downloading
//! - Mapping transport and status failures to `FerryError`

use crate::config::CrawlerConfig;
use crate::FerryError;
use futures::StreamExt;
use reqwest::{header::CONTENT_TYPE, redirect::Policy, Client, Response};
use sha2::{Digest, Sha256};
use std::time::Duration;
use url::Url;

/// Maximum number of redirect hops followed per request
pub const MAX_REDIRECTS: usize = 10;

/// A successfully fetched page
#[derive(Debug)]
pub struct FetchResult {
    /// Final URL after redirects
    pub final_url: Url,
    /// Content-Type header value, empty if absent
    pub content_type: String,
    /// Page body content
    pub body: String,
}

/// A successfully downloaded asset
#[derive(Debug)]
pub struct FetchedAsset {
    /// Hex SHA-256 of `bytes`, computed while streaming
    pub hash: String,
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// Builds an HTTP client with proper configuration
///
/// # Example
///
/// ```
/// use site_ferry::config::CrawlerConfig;
/// use site_ferry::crawler::build_http_client;
///
/// let config = CrawlerConfig::with_start_url("https://example.com/");
/// let client = build_http_client(&config).unwrap();
/// ```
pub fn build_http_client(config: &CrawlerConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .redirect(Policy::limited(MAX_REDIRECTS))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches a page and decodes its body as text
///
/// Transport failures (including timeouts and redirect loops) become
/// `FerryError::Http`; a non-success final status becomes
/// `FerryError::Status`.
pub async fn fetch_url(client: &Client, url: &str) -> Result<FetchResult, FerryError> {
    let response = send(client, url).await?;

    let final_url = response.url().clone();
    let content_type = content_type_of(&response);

    let body = response.text().await.map_err(|source| FerryError::Http {
        url: url.to_string(),
        source,
    })?;

    Ok(FetchResult {
        final_url,
        content_type,
        body,
    })
}

/// Downloads an asset, hashing the body chunk by chunk
pub async fn fetch_asset(client: &Client, url: &str) -> Result<FetchedAsset, FerryError> {
    let response = send(client, url).await?;
    let content_type = content_type_of(&response);

    let mut hasher = Sha256::new();
    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|source| FerryError::Http {
            url: url.to_string(),
            source,
        })?;
        hasher.update(&chunk);
        bytes.extend_from_slice(&chunk);
    }

    Ok(FetchedAsset {
        hash: hex::encode(hasher.finalize()),
        bytes,
        content_type,
    })
}

async fn send(client: &Client, url: &str) -> Result<Response, FerryError> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|source| FerryError::Http {
            url: url.to_string(),
            source,
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(FerryError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    Ok(response)
}

fn content_type_of(response: &Response) -> String {
    response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string()
}
