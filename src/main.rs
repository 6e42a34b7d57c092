//! Site-Ferry main entry point
//!
//! This is the command-line interface for the Site-Ferry migration pipeline.

use anyhow::Context;
use clap::{Parser, Subcommand};
use site_ferry::config::{load_config_with_hash, Config};
use site_ferry::output::{load_statistics, print_statistics, ValidationReport};
use site_ferry::Pipeline;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Site-Ferry: move a website into linked Markdown
///
/// Site-Ferry crawls a site into a content-addressed archive, downloads the
/// assets its pages reference and rewrites everything into a Markdown tree
/// whose links point at each other. Every stage can be resumed.
#[derive(Parser, Debug)]
#[command(name = "site-ferry")]
#[command(version = "1.0.0")]
#[command(about = "Website to Markdown migration pipeline", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Stage to run; all stages run in order when omitted
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch every page of the site into the content store
    Crawl,
    /// Register the assets referenced by downloaded pages
    ExtractAssets,
    /// Download Pending assets
    DownloadAssets,
    /// Write the Markdown tree
    Transform,
    /// Check local references of a Markdown tree
    Validate {
        /// Directory to check (defaults to the configured output directory)
        dir: Option<PathBuf>,
    },
    /// Show state store statistics and exit
    Stats,
    /// Validate the configuration and show what would be run
    CheckConfig,
}

/// Exit code when validation finds broken references
const EXIT_BROKEN_REFERENCES: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if let Some(Command::CheckConfig) = cli.command {
        handle_check_config(&config);
        return Ok(ExitCode::SUCCESS);
    }

    let pipeline = Pipeline::new(config).context("Failed to open pipeline state")?;

    match cli.command {
        Some(Command::Crawl) => {
            pipeline.crawl().await?;
        }
        Some(Command::ExtractAssets) => {
            pipeline.extract_assets()?;
        }
        Some(Command::DownloadAssets) => {
            pipeline.download_assets().await?;
        }
        Some(Command::Transform) => {
            pipeline.transform()?;
        }
        Some(Command::Validate { dir }) => {
            let report = pipeline.validate(dir.as_deref())?;
            return Ok(report_validation(&report));
        }
        Some(Command::Stats) => handle_stats(&pipeline)?,
        Some(Command::CheckConfig) => {}
        None => {
            let summary = pipeline.run_all().await?;
            tracing::info!(
                "Run complete: {} pages downloaded, {} assets downloaded, {} documents written",
                summary.crawl.downloaded,
                summary.assets.downloaded,
                summary.transform.written
            );
            return Ok(report_validation(&summary.validation));
        }
    }

    Ok(ExitCode::SUCCESS)
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("site_ferry=info,warn"),
            1 => EnvFilter::new("site_ferry=debug,info"),
            2 => EnvFilter::new("site_ferry=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Prints broken references and picks the exit code
fn report_validation(report: &ValidationReport) -> ExitCode {
    if report.is_success() {
        println!(
            "All {} references in {} documents resolve",
            report.references, report.documents
        );
        return ExitCode::SUCCESS;
    }

    println!("Broken references ({}):", report.failures.len());
    for failure in &report.failures {
        println!("  {}: {}", failure.document.display(), failure.target);
    }
    ExitCode::from(EXIT_BROKEN_REFERENCES)
}

/// Handles the `check-config` command: shows what would be run
fn handle_check_config(config: &Config) {
    println!("=== Site-Ferry Configuration ===\n");

    println!("Crawler:");
    println!("  Start URL: {}", config.crawler.start_url);
    println!("  Workers: {}", config.crawler.max_workers);
    println!("  Request timeout: {}s", config.crawler.request_timeout_secs);
    println!("  User agent: {}", config.crawler.user_agent);
    println!(
        "  Asset extensions ({}): {}",
        config.crawler.asset_extensions.len(),
        config.crawler.asset_extensions.join(" ")
    );
    println!("  Ignore patterns ({}):", config.crawler.ignore_patterns.len());
    for pattern in &config.crawler.ignore_patterns {
        println!("    - {}", pattern);
    }

    println!("\nStorage:");
    println!("  Page map: {}", config.storage.site_map_path);
    println!("  Asset map: {}", config.storage.assets_map_path);
    println!("  Content store: {}", config.storage.content_dir);

    println!("\nTransform:");
    println!("  Output: {}", config.transform.output_dir);
    println!("  Assets: {}", config.transform.assets_dir);
    println!("  Content selector: {}", config.transform.content_selector);
    println!(
        "  Ignored selectors: {}",
        config.transform.ignored_selectors.join(", ")
    );
    println!("  Excluded URLs ({}):", config.transform.ignored_urls.len());
    for pattern in &config.transform.ignored_urls {
        println!("    - {}", pattern);
    }
    println!("  Remap rules ({}):", config.transform.remap.len());
    for rule in &config.transform.remap {
        println!("    - {} -> {}", rule.pattern, rule.replacement);
    }
    println!("  Broken link fixes: {}", config.transform.broken_links.len());
    println!("  Clean output: {}", config.transform.clean_output);

    println!("\n✓ Configuration is valid");
}

/// Handles the `stats` command: prints statistics for both state stores
fn handle_stats(pipeline: &Pipeline) -> anyhow::Result<()> {
    let pages = load_statistics("Pages", pipeline.pages())?;
    print_statistics(&pages);

    let assets = load_statistics("Assets", pipeline.assets())?;
    print_statistics(&assets);

    Ok(())
}
