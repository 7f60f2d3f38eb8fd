//! Catalog-Scraper main entry point
//!
//! This is the command-line interface for the resumable product catalog
//! crawler.

use anyhow::{Context, Result};
use catalog_scraper::config::{load_config_with_hash, validate, Config, DiscoveryMode};
use catalog_scraper::crawler::run_crawl;
use catalog_scraper::output::{load_catalog_statistics, print_catalog_statistics, print_run_statistics};
use catalog_scraper::storage::regenerate_catalog;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Catalog-Scraper: a resumable product catalog crawler
///
/// Discovers product pages on an e-commerce site, extracts a flat record from
/// each, and streams every record to disk with a checkpoint so an interrupted
/// run picks up where it stopped.
#[derive(Parser, Debug)]
#[command(name = "catalog-scraper")]
#[command(version)]
#[command(about = "A resumable product catalog crawler", long_about = None)]
struct Cli {
    /// Listing URL (listing mode) or seed URL (site mode)
    #[arg(value_name = "START_URL")]
    start_url: Option<String>,

    /// Path to TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Discovery mode: listing or site
    #[arg(long, value_name = "MODE")]
    mode: Option<DiscoveryMode>,

    /// Pause between consecutive requests, in milliseconds
    #[arg(long, value_name = "MS")]
    delay_ms: Option<u64>,

    /// Directory receiving the output files
    #[arg(short, long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Also save each stored product's images next to the catalog
    #[arg(long)]
    download_images: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Ignore and clear previous progress
    #[arg(long)]
    fresh: bool,

    /// Show the effective configuration and exit
    #[arg(long, conflicts_with_all = ["stats", "regen"])]
    dry_run: bool,

    /// Print statistics for the stored catalog and exit
    #[arg(long, conflicts_with_all = ["dry_run", "regen"])]
    stats: bool,

    /// Rebuild the CSV and JSON files from the JSON-lines store and exit
    #[arg(long, conflicts_with_all = ["dry_run", "stats"])]
    regen: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let (config, config_hash) = load_effective_config(&cli)?;

    if cli.dry_run {
        handle_dry_run(&config, config_hash.as_deref(), cli.fresh)
    } else if cli.stats {
        handle_stats(&config)
    } else if cli.regen {
        handle_regen(&config)
    } else {
        handle_crawl(config, cli.fresh).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("catalog_scraper=info,warn"),
            1 => EnvFilter::new("catalog_scraper=debug,info"),
            2 => EnvFilter::new("catalog_scraper=trace,debug"),
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

/// Loads the config file (if any) and applies command-line overrides
fn load_effective_config(cli: &Cli) -> Result<(Config, Option<String>)> {
    let (mut config, hash) = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("failed to load {}", path.display()))?;
            tracing::info!("Configuration loaded (hash: {})", hash);
            (config, Some(hash))
        }
        None => (Config::default(), None),
    };

    if let Some(start_url) = &cli.start_url {
        config.crawler.start_url = start_url.clone();
    }
    if let Some(mode) = cli.mode {
        config.crawler.mode = mode;
    }
    if let Some(delay_ms) = cli.delay_ms {
        config.crawler.delay_ms = delay_ms;
    }
    if let Some(dir) = &cli.output_dir {
        config.output.directory = dir.to_string_lossy().into_owned();
    }
    if cli.download_images {
        config.output.download_images = true;
    }

    Ok((config, hash))
}

/// Handles the --dry-run mode: validates config and shows what would run
fn handle_dry_run(config: &Config, config_hash: Option<&str>, fresh: bool) -> Result<()> {
    validate(config).context("invalid configuration")?;
    let paths = config.output.paths();

    println!("=== Catalog-Scraper Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Mode: {}", config.crawler.mode.as_str());
    println!("  Start URL: {}", config.crawler.start_url);
    println!("  Delay between requests: {}ms", config.crawler.delay_ms);
    if let Some(cap) = config.crawler.max_site_pages {
        println!("  Max site pages: {}", cap);
    }

    println!("\nFetcher:");
    println!("  Attempts per URL: {}", config.fetcher.max_retries);
    println!("  Base backoff: {}ms", config.fetcher.base_backoff_ms);
    println!("  Timeout: {}s", config.fetcher.timeout_secs);
    println!("  User agent: {}", config.fetcher.user_agent);

    if config.crawler.mode == DiscoveryMode::Site {
        let signals: Vec<String> = config
            .classifier
            .signals
            .iter()
            .map(|s| format!("{:?}", s))
            .collect();
        println!("\nProduct Page Signals: {}", signals.join(", "));
        println!("  URL markers: {}", config.classifier.url_markers.join(", "));
    }

    println!("\nOutput:");
    println!("  Records: {}", paths.records.display());
    println!("  Table: {}", paths.table.display());
    if config.output.materialize_json {
        println!("  Catalog: {}", paths.catalog.display());
    }
    println!("  Checkpoint: {}", paths.checkpoint.display());
    println!("  Image columns: {}", config.output.image_columns);
    if config.output.download_images {
        println!(
            "  Images: {} (up to {} per product)",
            paths.images.display(),
            config.output.images_per_product
        );
    }

    if let Some(hash) = config_hash {
        println!("\nConfig hash: {}", hash);
    }

    println!("\n✓ Configuration is valid");
    if fresh {
        println!("✓ Would discard previous progress and start over");
    } else {
        println!("✓ Would resume from the checkpoint if one exists");
    }

    Ok(())
}

/// Handles the --stats mode: summarizes the stored catalog
fn handle_stats(config: &Config) -> Result<()> {
    let paths = config.output.paths();
    println!("Records: {}\n", paths.records.display());

    let stats = load_catalog_statistics(&paths.records)
        .with_context(|| format!("failed to read {}", paths.records.display()))?;
    print_catalog_statistics(&stats);

    Ok(())
}

/// Handles the --regen mode: rebuilds derived files from the JSON-lines store
fn handle_regen(config: &Config) -> Result<()> {
    let paths = config.output.paths();
    println!("=== Regenerating Catalog ===\n");
    println!("Source: {}", paths.records.display());

    let report = regenerate_catalog(&paths, config.output.image_columns)
        .context("regeneration failed")?;

    println!("✓ {} record(s) written", report.records);
    if report.duplicates_dropped > 0 {
        println!("✓ {} duplicate(s) dropped", report.duplicates_dropped);
    }
    println!("  - {}", paths.records.display());
    println!("  - {}", paths.table.display());
    println!("  - {}", paths.catalog.display());

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, fresh: bool) -> Result<()> {
    validate(&config).context("invalid configuration")?;

    if fresh {
        tracing::info!("Starting fresh crawl (ignoring previous progress)");
    } else {
        tracing::info!("Starting crawl (resuming from checkpoint if present)");
    }

    match run_crawl(config, fresh).await {
        Ok(stats) => {
            print_run_statistics(&stats);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e).context("crawl aborted")
        }
    }
}
