//! Configuration module for Catalog-Scraper
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Every key has a default, so a run can also be configured entirely from the
//! command line.
//!
//! # Example
//!
//! ```no_run
//! use catalog_scraper::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("scraper.toml")).unwrap();
//! println!("Crawling from: {}", config.crawler.start_url);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    ClassifierConfig, Config, CrawlerConfig, DiscoveryMode, FetcherConfig, OutputConfig,
    OutputPaths, ProductSignal, DEFAULT_USER_AGENT,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, run_fingerprint};
pub use validation::validate;
