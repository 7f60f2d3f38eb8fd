//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the crawl loop that ties the pipeline together:
//! - Opening the sink and resuming from the checkpoint
//! - Discovering product URLs (paginated listing or whole-site traversal)
//! - Fetching, extracting and persisting one product at a time
//! - Saving product images when enabled
//! - Materializing the aggregate document at the end
//!
//! Everything runs on one task. Each fetch is awaited before the next one
//! starts, so exactly one outcome is in flight and the checkpoint always
//! matches the records on disk.

use crate::config::{run_fingerprint, validate, Config, DiscoveryMode};
use crate::crawler::downloader::ImageDownloader;
use crate::crawler::fetcher::{FetchFailure, FetchedPage, Fetcher, HttpFetcher};
use crate::crawler::frontier::{page_links, Frontier};
use crate::crawler::pacer::Pacer;
use crate::extract::{
    extract_product_links, find_max_listing_page, ExtractionProfile, PageClassifier,
    ProductExtractor,
};
use crate::model::{ExtractionFailure, Outcome, Product};
use crate::output::RunStatistics;
use crate::storage::{materialize_catalog, RecordStatus, ResumableSink};
use crate::url::{build_listing_page_url, normalize_url, visit_key};
use crate::ScrapeError;
use indexmap::IndexSet;
use scraper::Html;
use std::time::Instant;
use url::Url;

/// What a visited page yielded during traversal
struct PageVisit {
    links: Vec<Url>,
    product: Option<Outcome>,
}

/// Main crawler coordinator structure
///
/// Owns every piece of mutable crawl state; several coordinators can run
/// independently in one process.
pub struct Coordinator {
    config: Config,
    start_url: Url,
    fetcher: Box<dyn Fetcher>,
    extractor: ProductExtractor,
    classifier: PageClassifier,
    sink: ResumableSink,
    pacer: Pacer,
    downloader: Option<ImageDownloader>,
    stats: RunStatistics,
}

impl Coordinator {
    /// Creates a new coordinator backed by the HTTP fetcher
    ///
    /// # Arguments
    ///
    /// * `config` - The crawler configuration
    /// * `fresh` - Discard previous progress and start over
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Ready to run
    /// * `Err(ScrapeError)` - Invalid configuration or unusable output files
    pub fn new(config: Config, fresh: bool) -> Result<Self, ScrapeError> {
        let fetcher = HttpFetcher::new(&config.fetcher)?;
        let downloader = config.output.download_images.then(|| {
            ImageDownloader::new(
                fetcher.client().clone(),
                config.output.paths().images,
                config.output.images_per_product,
            )
        });

        let mut coordinator = Self::with_fetcher(config, fresh, Box::new(fetcher))?;
        coordinator.downloader = downloader;
        Ok(coordinator)
    }

    /// Creates a coordinator with a custom fetcher
    ///
    /// Images are never downloaded through a custom fetcher.
    pub fn with_fetcher(
        config: Config,
        fresh: bool,
        fetcher: Box<dyn Fetcher>,
    ) -> Result<Self, ScrapeError> {
        validate(&config)?;

        let start_url = normalize_url(&config.crawler.start_url)?;
        let paths = config.output.paths();
        let sink = ResumableSink::open(
            &paths,
            config.output.image_columns,
            fresh,
            &run_fingerprint(&config),
        )?;

        if sink.completed_count() > 0 {
            tracing::info!(
                "Resuming: {} product(s) already completed",
                sink.completed_count()
            );
        }

        // Whole-site pages come from arbitrary templates, so site mode adds
        // the generic microdata and meta-tag strategies.
        let profile = match config.crawler.mode {
            DiscoveryMode::Listing => ExtractionProfile::default(),
            DiscoveryMode::Site => ExtractionProfile::site(),
        };

        Ok(Self {
            start_url,
            fetcher,
            extractor: ProductExtractor::new(profile),
            classifier: PageClassifier::new(config.classifier.clone()),
            sink,
            pacer: Pacer::from_millis(config.crawler.delay_ms),
            downloader: None,
            stats: RunStatistics::new(config.crawler.mode),
            config,
        })
    }

    /// Runs the crawl to completion
    ///
    /// # Returns
    ///
    /// * `Ok(RunStatistics)` - Counters for this run
    /// * `Err(ScrapeError)` - The first listing or seed page could not be
    ///   fetched; nothing else is fatal
    pub async fn run(&mut self) -> Result<RunStatistics, ScrapeError> {
        let started = Instant::now();
        tracing::info!(
            "Starting {} crawl from {} ({:?} between requests)",
            self.config.crawler.mode.as_str(),
            self.start_url,
            self.pacer.delay()
        );
        if let Some(downloader) = &self.downloader {
            tracing::info!("Saving product images to {}", downloader.directory().display());
        }

        match self.config.crawler.mode {
            DiscoveryMode::Listing => self.run_listing().await?,
            DiscoveryMode::Site => self.run_site().await?,
        }

        if self.config.output.materialize_json {
            let paths = self.config.output.paths();
            if let Err(e) = materialize_catalog(&paths.records, &paths.catalog) {
                tracing::warn!("Could not write {}: {}", paths.catalog.display(), e);
            }
        }

        self.stats.persistence_errors = self.sink.persistence_errors();
        self.stats.elapsed = started.elapsed();

        tracing::info!(
            "Crawl complete: {} succeeded, {} failed, {} skipped in {:?}",
            self.stats.succeeded,
            self.stats.failed,
            self.stats.already_completed,
            self.stats.elapsed
        );

        Ok(self.stats.clone())
    }

    /// Paces, then fetches
    ///
    /// The pause before the next request starts once this one has returned,
    /// retries included.
    async fn fetch(&mut self, url: &Url) -> Result<FetchedPage, FetchFailure> {
        self.pacer.wait_turn().await;
        let result = self.fetcher.fetch(url).await;
        self.pacer.record_completion(Instant::now());
        result
    }

    /// Paginated-listing discovery followed by per-product processing
    async fn run_listing(&mut self) -> Result<(), ScrapeError> {
        let start_url = self.start_url.clone();
        let first = self
            .fetch(&start_url)
            .await
            .map_err(ScrapeError::SeedFetch)?;

        let max_page = find_max_listing_page(&first.body);
        tracing::info!("Listing has {} page(s)", max_page);

        let mut candidates: IndexSet<String> = IndexSet::new();
        let mut first = Some(first);

        for page in 1..=max_page {
            let listing = match first.take() {
                Some(page_one) => page_one,
                None => {
                    let page_url = build_listing_page_url(&start_url, page);
                    match self.fetch(&page_url).await {
                        Ok(listing) => listing,
                        Err(e) => {
                            tracing::warn!("Skipping listing page {}: {}", page, e);
                            continue;
                        }
                    }
                }
            };

            self.stats.listing_pages += 1;
            let before = candidates.len();
            candidates.extend(extract_product_links(&listing.body, &listing.final_url));
            tracing::info!(
                "Listing page {}/{}: {} new product link(s)",
                page,
                max_page,
                candidates.len() - before
            );
        }

        self.stats.discovered = candidates.len();
        tracing::info!("Found {} product URL(s)", candidates.len());

        let pending: Vec<String> = candidates
            .into_iter()
            .filter(|url| {
                let done = self.sink.is_completed(url);
                if done {
                    tracing::debug!("Skipping completed {}", url);
                }
                !done
            })
            .collect();
        self.stats.already_completed = self.stats.discovered - pending.len();

        let total = pending.len();
        for (index, key) in pending.iter().enumerate() {
            tracing::info!("[{}/{}] {}", index + 1, total, key);
            let outcome = self.fetch_product(key).await;
            self.record(key, outcome).await;
        }

        Ok(())
    }

    async fn fetch_product(&mut self, key: &str) -> Outcome {
        let url = match Url::parse(key) {
            Ok(url) => url,
            Err(e) => {
                return Err(ExtractionFailure::FetchFailed {
                    attempts: 0,
                    last_error: format!("invalid URL: {}", e),
                })
            }
        };

        match self.fetch(&url).await {
            Ok(page) => self.extractor.extract(&page.body, &url),
            Err(failure) => Err(failure.into()),
        }
    }

    /// Whole-site breadth-first traversal with extraction on each product page
    ///
    /// Pages stored by an earlier run are still fetched so their links keep
    /// feeding the frontier; only their extraction and persistence are
    /// skipped.
    async fn run_site(&mut self) -> Result<(), ScrapeError> {
        let mut frontier = Frontier::new(self.start_url.clone());
        let cap = self.config.crawler.max_site_pages;
        let mut is_seed = true;

        while let Some(url) = frontier.pop() {
            if cap.is_some_and(|cap| self.stats.pages_visited >= cap) {
                tracing::info!(
                    "Reached max-site-pages ({}); {} page(s) left unvisited",
                    self.stats.pages_visited,
                    frontier.len() + 1
                );
                break;
            }

            let key = visit_key(&url);
            let completed = self.sink.is_completed(&key);

            let page = match self.fetch(&url).await {
                Ok(page) => page,
                Err(failure) if is_seed => return Err(ScrapeError::SeedFetch(failure)),
                Err(failure) => {
                    tracing::warn!("{}", failure);
                    continue;
                }
            };
            is_seed = false;
            self.stats.pages_visited += 1;

            let visit = self.visit(&page, &url, &key, !completed);
            let queued = frontier.extend(visit.links);
            tracing::debug!(
                "Visited {} ({} new link(s), {} queued)",
                key,
                queued,
                frontier.len()
            );

            if completed {
                tracing::debug!("{} already stored; following its links only", key);
                self.stats.already_completed += 1;
            } else if let Some(outcome) = visit.product {
                self.stats.discovered += 1;
                self.record(&key, outcome).await;
            }
        }

        tracing::info!(
            "Traversal finished: {} page(s) visited, {} distinct page(s) seen",
            self.stats.pages_visited,
            frontier.seen_count()
        );
        Ok(())
    }

    /// Parses a fetched page once for links, classification and extraction
    fn visit(&self, page: &FetchedPage, url: &Url, key: &str, extract: bool) -> PageVisit {
        let document = Html::parse_document(&page.body);
        let links = page_links(&document, &page.final_url);
        if !extract {
            return PageVisit {
                links,
                product: None,
            };
        }

        let product = self
            .classifier
            .matching_signal(&document, url)
            .map(|signal| {
                tracing::debug!("{} classified as product by {:?}", key, signal);
                self.extractor
                    .extract_document(&document, url)
                    .map(|mut product| {
                        product.url = key.to_string();
                        product
                    })
            });

        PageVisit { links, product }
    }

    async fn record(&mut self, key: &str, outcome: Outcome) {
        match self.sink.record_outcome(key, &outcome) {
            RecordStatus::Stored => {
                if let Ok(product) = &outcome {
                    self.stats.record_product(product);
                    self.download_images(product).await;
                }
            }
            RecordStatus::AlreadyCompleted => self.stats.already_completed += 1,
            RecordStatus::Failed => self.stats.failed += 1,
            RecordStatus::NotPersisted => self.stats.not_persisted += 1,
        }
    }

    /// Saves the first images of a stored product
    ///
    /// Image failures are logged and never affect the product's record.
    async fn download_images(&mut self, product: &Product) {
        let Some(downloader) = self.downloader.as_ref() else {
            return;
        };

        for image in product.images.iter().take(downloader.per_product()) {
            let path = match downloader.local_path(image) {
                Ok(path) => path,
                Err(e) => {
                    tracing::warn!("Skipping image {}: {}", image, e);
                    continue;
                }
            };
            if path.exists() {
                tracing::debug!("Image {} already saved", image);
                continue;
            }

            self.pacer.wait_turn().await;
            let result = downloader.save(image, &path).await;
            self.pacer.record_completion(Instant::now());

            match result {
                Ok(()) => self.stats.images_downloaded += 1,
                Err(e) => tracing::warn!("Could not download {}: {}", image, e),
            }
        }
    }
}

/// Runs a complete crawl with the HTTP fetcher
///
/// # Example
///
/// ```no_run
/// use catalog_scraper::config::load_config;
/// use catalog_scraper::crawler::run_crawl;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new("scraper.toml"))?;
/// let stats = run_crawl(config, false).await?;
/// println!("{} products stored", stats.succeeded);
/// # Ok(())
/// # }
/// ```
pub async fn run_crawl(config: Config, fresh: bool) -> Result<RunStatistics, ScrapeError> {
    let mut coordinator = Coordinator::new(config, fresh)?;
    coordinator.run().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CrawlerConfig, OutputConfig};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tempfile::TempDir;

    /// Serves canned pages and records every request
    struct ScriptedFetcher {
        pages: HashMap<String, String>,
        requests: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl Fetcher for ScriptedFetcher {
        async fn fetch(&self, url: &Url) -> Result<FetchedPage, FetchFailure> {
            self.requests.lock().unwrap().push(url.to_string());
            match self.pages.get(url.as_str()) {
                Some(body) => Ok(FetchedPage {
                    final_url: url.clone(),
                    status: 200,
                    body: body.clone(),
                }),
                None => Err(FetchFailure {
                    url: url.to_string(),
                    attempts: 3,
                    last_error: "HTTP 404".to_string(),
                }),
            }
        }
    }

    fn create_test_config(dir: &TempDir, mode: DiscoveryMode, start_url: &str) -> Config {
        Config {
            crawler: CrawlerConfig {
                mode,
                start_url: start_url.to_string(),
                delay_ms: 0,
                max_site_pages: None,
            },
            output: OutputConfig {
                directory: dir.path().to_string_lossy().into_owned(),
                ..OutputConfig::default()
            },
            ..Config::default()
        }
    }

    fn coordinator(
        config: Config,
        pages: &[(&str, &str)],
    ) -> (Coordinator, Arc<Mutex<Vec<String>>>) {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let fetcher = ScriptedFetcher {
            pages: pages
                .iter()
                .map(|(url, body)| (url.to_string(), body.to_string()))
                .collect(),
            requests: requests.clone(),
        };
        (
            Coordinator::with_fetcher(config, false, Box::new(fetcher)).unwrap(),
            requests,
        )
    }

    const LISTING: &str = r#"
        <a href="/widget-one/"><img src="/products/1/one.jpg"></a>
        <a href="/widget-two/"><img src="/products/2/two.jpg"></a>"#;

    #[tokio::test]
    async fn test_listing_run_stores_products() {
        let dir = TempDir::new().unwrap();
        let config = create_test_config(&dir, DiscoveryMode::Listing, "https://shop.test/all/");
        let (mut coordinator, requests) = coordinator(
            config,
            &[
                ("https://shop.test/all/", LISTING),
                ("https://shop.test/widget-one/", "<h1>Widget One</h1>"),
                ("https://shop.test/widget-two/", "<h1>Widget Two</h1>"),
            ],
        );

        let stats = coordinator.run().await.unwrap();

        assert_eq!(stats.discovered, 2);
        assert_eq!(stats.succeeded, 2);
        assert_eq!(requests.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_unfetchable_product_does_not_stop_run() {
        let dir = TempDir::new().unwrap();
        let config = create_test_config(&dir, DiscoveryMode::Listing, "https://shop.test/all/");
        let (mut coordinator, _) = coordinator(
            config,
            &[
                ("https://shop.test/all/", LISTING),
                ("https://shop.test/widget-two/", "<h1>Widget Two</h1>"),
            ],
        );

        let stats = coordinator.run().await.unwrap();

        assert_eq!(stats.failed, 1);
        assert_eq!(stats.succeeded, 1);
        assert!(!coordinator.sink.is_completed("https://shop.test/widget-one/"));
        assert!(coordinator.sink.is_completed("https://shop.test/widget-two/"));
    }

    #[tokio::test]
    async fn test_listing_seed_failure_is_fatal() {
        let dir = TempDir::new().unwrap();
        let config = create_test_config(&dir, DiscoveryMode::Listing, "https://shop.test/all/");
        let (mut coordinator, _) = coordinator(config, &[]);

        let result = coordinator.run().await;
        assert!(matches!(result, Err(ScrapeError::SeedFetch(_))));
    }

    #[tokio::test]
    async fn test_site_run_extracts_only_product_pages() {
        let dir = TempDir::new().unwrap();
        let mut config = create_test_config(&dir, DiscoveryMode::Site, "https://shop.test/");
        config.classifier.signals = vec![crate::config::ProductSignal::ProductMicrodata];
        let (mut coordinator, requests) = coordinator(
            config,
            &[
                (
                    "https://shop.test/",
                    r#"<a href="/about">About</a><a href="/widget#top">Widget</a><a href="https://other.test/x">Out</a>"#,
                ),
                ("https://shop.test/about", r#"<h1>About</h1><a href="/">Home</a>"#),
                (
                    "https://shop.test/widget",
                    r#"<div itemtype="https://schema.org/Product"><h1>Widget</h1></div><a href="/widget/">Self</a>"#,
                ),
            ],
        );

        let stats = coordinator.run().await.unwrap();

        assert_eq!(stats.pages_visited, 3);
        assert_eq!(stats.discovered, 1);
        assert_eq!(stats.succeeded, 1);
        assert!(coordinator.sink.is_completed("https://shop.test/widget"));
        assert_eq!(requests.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_site_page_cap() {
        let dir = TempDir::new().unwrap();
        let mut config = create_test_config(&dir, DiscoveryMode::Site, "https://shop.test/");
        config.crawler.max_site_pages = Some(1);
        let (mut coordinator, requests) = coordinator(
            config,
            &[
                ("https://shop.test/", r#"<a href="/about">About</a>"#),
                ("https://shop.test/about", "<p>About</p>"),
            ],
        );

        let stats = coordinator.run().await.unwrap();
        assert_eq!(stats.pages_visited, 1);
        assert_eq!(requests.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_site_resume_follows_links_of_stored_pages() {
        let dir = TempDir::new().unwrap();
        let mut config = create_test_config(&dir, DiscoveryMode::Site, "https://shop.test/");
        config.classifier.signals = vec![crate::config::ProductSignal::ProductMicrodata];

        let home = r#"<a href="/widget">Widget</a>"#;
        let widget = r#"<div itemtype="https://schema.org/Product"><h1>Widget</h1></div>
            <a href="/gadget">Related</a>"#;
        let gadget = r#"<div itemtype="https://schema.org/Product"><h1>Gadget</h1></div>"#;

        // First run: the related product is down
        let (mut first, _) = coordinator(
            config.clone(),
            &[("https://shop.test/", home), ("https://shop.test/widget", widget)],
        );
        let stats = first.run().await.unwrap();
        assert_eq!(stats.succeeded, 1);
        drop(first);

        // Second run: it is only reachable through the already stored widget
        let (mut second, requests) = coordinator(
            config.clone(),
            &[
                ("https://shop.test/", home),
                ("https://shop.test/widget", widget),
                ("https://shop.test/gadget", gadget),
            ],
        );
        let stats = second.run().await.unwrap();

        assert_eq!(stats.already_completed, 1);
        assert_eq!(stats.succeeded, 1);
        assert!(second.sink.is_completed("https://shop.test/gadget"));
        assert!(requests
            .lock()
            .unwrap()
            .contains(&"https://shop.test/widget".to_string()));

        let records = std::fs::read_to_string(config.output.paths().records).unwrap();
        assert_eq!(records.lines().count(), 2);
        assert_eq!(records.matches("https://shop.test/widget").count(), 1);
    }

    #[tokio::test]
    async fn test_site_profile_used_in_site_mode() {
        let dir = TempDir::new().unwrap();
        let mut config = create_test_config(&dir, DiscoveryMode::Site, "https://shop.test/");
        config.classifier.signals = vec![crate::config::ProductSignal::ProductMicrodata];
        let (mut coordinator, _) = coordinator(
            config,
            &[(
                "https://shop.test/",
                r#"<html><head><title>Banjo | Shop</title></head><body>
                <div itemscope itemtype="https://schema.org/Product">
                <meta itemprop="price" content="12.50"></div></body></html>"#,
            )],
        );

        let stats = coordinator.run().await.unwrap();
        assert_eq!(stats.succeeded, 1);
        assert_eq!(stats.with_price, 1);
    }

    /// Takes a fixed time per fetch and notes when each one ran
    struct SlowFetcher {
        inner: ScriptedFetcher,
        latency: Duration,
        spans: Arc<Mutex<Vec<(Instant, Instant)>>>,
    }

    #[async_trait]
    impl Fetcher for SlowFetcher {
        async fn fetch(&self, url: &Url) -> Result<FetchedPage, FetchFailure> {
            let started = Instant::now();
            tokio::time::sleep(self.latency).await;
            let result = self.inner.fetch(url).await;
            self.spans.lock().unwrap().push((started, Instant::now()));
            result
        }
    }

    #[tokio::test]
    async fn test_delay_separates_end_of_fetch_from_next_start() {
        let dir = TempDir::new().unwrap();
        let mut config = create_test_config(&dir, DiscoveryMode::Listing, "https://shop.test/all/");
        config.crawler.delay_ms = 50;

        let spans = Arc::new(Mutex::new(Vec::new()));
        let fetcher = SlowFetcher {
            inner: ScriptedFetcher {
                pages: [
                    ("https://shop.test/all/", LISTING),
                    ("https://shop.test/widget-one/", "<h1>Widget One</h1>"),
                    ("https://shop.test/widget-two/", "<h1>Widget Two</h1>"),
                ]
                .iter()
                .map(|(url, body)| (url.to_string(), body.to_string()))
                .collect(),
                requests: Arc::new(Mutex::new(Vec::new())),
            },
            latency: Duration::from_millis(60),
            spans: spans.clone(),
        };
        let mut coordinator = Coordinator::with_fetcher(config, false, Box::new(fetcher)).unwrap();

        coordinator.run().await.unwrap();

        let spans = spans.lock().unwrap();
        assert_eq!(spans.len(), 3);
        for pair in spans.windows(2) {
            let (_, previous_end) = pair[0];
            let (next_start, _) = pair[1];
            assert!(next_start.duration_since(previous_end) >= Duration::from_millis(50));
        }
    }

    #[test]
    fn test_invalid_config_rejected() {
        let dir = TempDir::new().unwrap();
        let config = create_test_config(&dir, DiscoveryMode::Listing, "not a url");
        let fetcher = ScriptedFetcher {
            pages: HashMap::new(),
            requests: Arc::new(Mutex::new(Vec::new())),
        };
        let result = Coordinator::with_fetcher(config, false, Box::new(fetcher));
        assert!(matches!(result, Err(ScrapeError::Config(_))));
    }
}
