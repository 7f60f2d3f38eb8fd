//! Crawler module for page fetching and crawl orchestration
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with one retry and backoff policy
//! - Optional product image download
//! - Fixed pacing between consecutive requests
//! - The breadth-first frontier for whole-site traversal
//! - Overall crawl coordination

mod coordinator;
mod downloader;
mod fetcher;
mod frontier;
mod pacer;

pub use coordinator::{run_crawl, Coordinator};
pub use downloader::{image_file_name, DownloadError, ImageDownloader};
pub use fetcher::{
    build_http_client, is_transient_status, FetchFailure, FetchedPage, Fetcher, HttpFetcher,
    RetryPolicy,
};
pub use frontier::{page_links, Frontier};
pub use pacer::Pacer;
