//! Catalog-Scraper: a resumable product catalog crawler
//!
//! This crate discovers product pages on an e-commerce site (either by walking a
//! paginated listing or by traversing the whole site), extracts a flat product
//! record from each page through ordered selector cascades, and streams every
//! record to durable storage with a checkpoint so interrupted runs pick up where
//! they stopped.

pub mod config;
pub mod crawler;
pub mod extract;
pub mod model;
pub mod output;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for Catalog-Scraper operations
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Failed to fetch start page: {0}")]
    SeedFetch(#[source] crawler::FetchFailure),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,
}

/// Result type alias for Catalog-Scraper operations
pub type Result<T> = std::result::Result<T, ScrapeError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use extract::{extract_product_links, find_max_listing_page, ProductExtractor};
pub use model::{ExtractionFailure, Product};
pub use url::{build_listing_page_url, normalize_url};
