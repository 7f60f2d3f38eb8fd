//! HTTP fetcher implementation
//!
//! This module is the only place that performs network I/O:
//! - Building the HTTP client with a browser-like request signature
//! - GET requests with a per-request timeout
//! - One retry policy with exponential backoff shared by every call site
//! - Classification of failures into transient and permanent

use crate::config::FetcherConfig;
use crate::model::ExtractionFailure;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use reqwest::{Client, StatusCode};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Connect timeout applied independently of the request timeout
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// A successfully fetched page
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// URL after redirects
    pub final_url: Url,
    pub status: u16,
    pub body: String,
}

/// Permanent failure to fetch a URL
#[derive(Debug, Clone, PartialEq, Error)]
#[error("failed to fetch {url} after {attempts} attempt(s): {last_error}")]
pub struct FetchFailure {
    pub url: String,
    pub attempts: u32,
    pub last_error: String,
}

impl From<FetchFailure> for ExtractionFailure {
    fn from(failure: FetchFailure) -> Self {
        ExtractionFailure::FetchFailed {
            attempts: failure.attempts,
            last_error: failure.last_error,
        }
    }
}

/// Retry and backoff policy
///
/// `max_attempts` counts every attempt, the first one included. The wait
/// before attempt `n + 1` is `base_backoff * 2^(n - 1)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_backoff,
        }
    }

    pub fn from_config(config: &FetcherConfig) -> Self {
        Self::new(
            config.max_retries,
            Duration::from_millis(config.base_backoff_ms),
        )
    }

    /// Delay to wait after the given failed attempt (1-based)
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.base_backoff.saturating_mul(1 << exponent)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&FetcherConfig::default())
    }
}

/// The fetch capability consumed by the crawl orchestrator
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetches a page, retrying transient failures
    async fn fetch(&self, url: &Url) -> Result<FetchedPage, FetchFailure>;
}

/// Why a single attempt failed
#[derive(Debug)]
enum AttemptError {
    /// Timeouts, connection problems, HTTP 5xx and 429
    Transient(String),
    /// Anything else; retrying would not help
    Permanent(String),
}

/// Returns true if a response status is worth retrying
pub fn is_transient_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// Builds an HTTP client with a browser-like request signature
///
/// # Arguments
///
/// * `config` - The fetcher configuration (user agent and timeout)
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use catalog_scraper::config::FetcherConfig;
/// use catalog_scraper::crawler::build_http_client;
///
/// let client = build_http_client(&FetcherConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &FetcherConfig) -> Result<Client, reqwest::Error> {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
        ),
    );
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));

    Client::builder()
        .user_agent(config.user_agent.clone())
        .default_headers(headers)
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(CONNECT_TIMEOUT)
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetcher backed by a reqwest client
pub struct HttpFetcher {
    client: Client,
    policy: RetryPolicy,
}

impl HttpFetcher {
    /// Creates a fetcher from configuration
    pub fn new(config: &FetcherConfig) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client(config)?,
            policy: RetryPolicy::from_config(config),
        })
    }

    /// The underlying client, shared with the image downloader
    pub fn client(&self) -> &Client {
        &self.client
    }

    async fn attempt(&self, url: &Url) -> Result<FetchedPage, AttemptError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(classify_request_error)?;

        let status = response.status();
        if !status.is_success() {
            let message = format!("HTTP {}", status.as_u16());
            return Err(if is_transient_status(status) {
                AttemptError::Transient(message)
            } else {
                AttemptError::Permanent(message)
            });
        }

        let final_url = response.url().clone();
        let body = response.text().await.map_err(classify_request_error)?;

        Ok(FetchedPage {
            final_url,
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &Url) -> Result<FetchedPage, FetchFailure> {
        let mut attempt = 0;

        loop {
            attempt += 1;

            let last_error = match self.attempt(url).await {
                Ok(page) => {
                    tracing::debug!("Fetched {} (HTTP {}, attempt {})", url, page.status, attempt);
                    return Ok(page);
                }
                Err(AttemptError::Permanent(error)) => {
                    tracing::debug!("Permanent failure for {}: {}", url, error);
                    error
                }
                Err(AttemptError::Transient(error)) if attempt < self.policy.max_attempts => {
                    let wait = self.policy.backoff(attempt);
                    tracing::warn!(
                        "Attempt {}/{} for {} failed ({}), retrying in {:?}",
                        attempt,
                        self.policy.max_attempts,
                        url,
                        error,
                        wait
                    );
                    tokio::time::sleep(wait).await;
                    continue;
                }
                Err(AttemptError::Transient(error)) => error,
            };

            return Err(FetchFailure {
                url: url.to_string(),
                attempts: attempt,
                last_error,
            });
        }
    }
}

fn classify_request_error(error: reqwest::Error) -> AttemptError {
    if error.is_timeout() {
        AttemptError::Transient("request timeout".to_string())
    } else if error.is_connect() {
        AttemptError::Transient(format!("connection error: {}", error))
    } else if error.status().is_some_and(is_transient_status) || error.is_body() {
        AttemptError::Transient(error.to_string())
    } else if error.is_request() {
        // Resets surface as request errors without a status
        AttemptError::Transient(error.to_string())
    } else {
        AttemptError::Permanent(error.to_string())
    }
}
