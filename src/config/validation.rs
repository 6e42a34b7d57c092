use crate::config::types::{Config, CrawlerConfig, StorageConfig, TransformConfig};
use crate::ConfigError;
use regex::Regex;
use std::path::Path;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_storage_config(&config.storage)?;
    validate_transform_config(&config.transform)?;
    validate_output_location(&config.storage, &config.transform)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.start_url).map_err(|e| {
        ConfigError::InvalidUrl(format!("Invalid start-url '{}': {}", config.start_url, e))
    })?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "start-url '{}' must use http or https",
            config.start_url
        )));
    }

    if url.host_str().is_none() {
        return Err(ConfigError::InvalidUrl(format!(
            "start-url '{}' has no host",
            config.start_url
        )));
    }

    if config.max_workers < 1 || config.max_workers > 100 {
        return Err(ConfigError::Validation(format!(
            "max-workers must be between 1 and 100, got {}",
            config.max_workers
        )));
    }

    if config.request_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "request-timeout-secs must be >= 1".to_string(),
        ));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    for ext in &config.asset_extensions {
        validate_extension(ext)?;
    }

    validate_patterns(&config.ignore_patterns)?;

    Ok(())
}

/// Validates storage locations
fn validate_storage_config(config: &StorageConfig) -> Result<(), ConfigError> {
    for (name, value) in [
        ("site-map-path", &config.site_map_path),
        ("assets-map-path", &config.assets_map_path),
        ("content-dir", &config.content_dir),
    ] {
        if value.is_empty() {
            return Err(ConfigError::Validation(format!("{} cannot be empty", name)));
        }
    }

    if config.site_map_path == config.assets_map_path {
        return Err(ConfigError::Validation(
            "site-map-path and assets-map-path must differ".to_string(),
        ));
    }

    Ok(())
}

/// Validates transform configuration
fn validate_transform_config(config: &TransformConfig) -> Result<(), ConfigError> {
    if config.output_dir.is_empty() {
        return Err(ConfigError::Validation(
            "output-dir cannot be empty".to_string(),
        ));
    }

    if config.assets_dir.is_empty() || Path::new(&config.assets_dir).is_absolute() {
        return Err(ConfigError::Validation(format!(
            "assets-dir must be a non-empty relative path, got '{}'",
            config.assets_dir
        )));
    }

    validate_selector(&config.content_selector)?;
    for selector in &config.ignored_selectors {
        validate_selector(selector)?;
    }

    validate_patterns(&config.ignored_urls)?;
    for rule in &config.remap {
        compile_pattern(&rule.pattern)?;
    }

    for fix in &config.broken_links {
        if fix.from.is_empty() {
            return Err(ConfigError::Validation(
                "broken-links entries need a non-empty 'from'".to_string(),
            ));
        }
    }

    Ok(())
}

/// Validates an asset extension such as `.pdf`
fn validate_extension(ext: &str) -> Result<(), ConfigError> {
    if ext.len() < 2 || !ext.starts_with('.') {
        return Err(ConfigError::Validation(format!(
            "asset extension must start with '.', got '{}'",
            ext
        )));
    }

    if ext[1..].contains(['.', '/']) {
        return Err(ConfigError::Validation(format!(
            "asset extension '{}' must be a single suffix",
            ext
        )));
    }

    Ok(())
}

fn validate_patterns(patterns: &[String]) -> Result<(), ConfigError> {
    for pattern in patterns {
        compile_pattern(pattern)?;
    }
    Ok(())
}

/// Compiles a regex, mapping failures to a configuration error
pub(crate) fn compile_pattern(pattern: &str) -> Result<Regex, ConfigError> {
    Regex::new(pattern).map_err(|e| ConfigError::InvalidPattern {
        pattern: pattern.to_string(),
        message: e.to_string(),
    })
}

/// The output directory is wiped before each transform, so it must not hold
/// the crawl state or the content store
fn validate_output_location(
    storage: &StorageConfig,
    transform: &TransformConfig,
) -> Result<(), ConfigError> {
    let output = crate::url::normalize_path(Path::new(&transform.output_dir));
    if output.as_os_str().is_empty() {
        return Err(ConfigError::Validation(format!(
            "output-dir '{}' must name a dedicated directory",
            transform.output_dir
        )));
    }

    for (name, value) in [
        ("site-map-path", &storage.site_map_path),
        ("assets-map-path", &storage.assets_map_path),
        ("content-dir", &storage.content_dir),
    ] {
        let path = crate::url::normalize_path(Path::new(value));
        if path.starts_with(&output) || output.starts_with(&path) {
            return Err(ConfigError::Validation(format!(
                "{} '{}' overlaps output-dir '{}'",
                name, value, transform.output_dir
            )));
        }
    }

    Ok(())
}

/// Selectors are used by both the DOM query and the rewriting layer, so they
/// must be accepted by both parsers.
fn validate_selector(selector: &str) -> Result<(), ConfigError> {
    if selector.trim().is_empty()
        || scraper::Selector::parse(selector).is_err()
        || selector.parse::<lol_html::Selector>().is_err()
    {
        return Err(ConfigError::InvalidSelector(selector.to_string()));
    }
    Ok(())
}
