//! Integration tests for the crawler
//!
//! These tests use wiremock to stand in for the target shop and run the full
//! discover, fetch, extract and persist cycle end-to-end against temporary
//! output directories.

use catalog_scraper::config::{Config, CrawlerConfig, DiscoveryMode, FetcherConfig, OutputConfig};
use catalog_scraper::crawler::{image_file_name, Coordinator};
use catalog_scraper::storage::{read_records, CrawlCheckpoint};
use catalog_scraper::{Product, ScrapeError};
use std::fs;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration pointing at the mock server
fn create_test_config(start_url: String, mode: DiscoveryMode, output: &TempDir) -> Config {
    Config {
        crawler: CrawlerConfig {
            mode,
            start_url,
            delay_ms: 0,
            max_site_pages: None,
        },
        fetcher: FetcherConfig {
            max_retries: 2,
            base_backoff_ms: 1,
            timeout_secs: 5,
            ..FetcherConfig::default()
        },
        output: OutputConfig {
            directory: output.path().to_string_lossy().into_owned(),
            ..OutputConfig::default()
        },
        ..Config::default()
    }
}

fn html(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body, "text/html; charset=utf-8")
}

fn product_card(slug: &str) -> String {
    format!(
        r#"<li class="product"><a href="/{slug}/"><img src="/stencil/500x659/products/1/{slug}.jpg"></a></li>"#,
        slug = slug
    )
}

fn product_page(name: &str, sku: &str, price: &str) -> String {
    format!(
        r#"<html><body>
        <nav class="breadcrumbs"><a href="/">Home</a><a href="/tapers/">Tapers</a></nav>
        <h5 class="productView-brand"><a href="/brands/acme/">Acme</a></h5>
        <h1 class="productView-title">{name}</h1>
        <dd class="productView-info-value--sku" data-product-sku="{sku}">{sku}</dd>
        <span class="price price--main">{price}</span>
        <p>In Stock</p>
        <div id="tab-description"><p>{name} for professionals.</p></div>
        <img class="productView-image" src="/stencil/608x608/products/9/{sku}.jpg">
        </body></html>"#,
        name = name,
        sku = sku,
        price = price
    )
}

/// Mounts a two-page listing: page 1 links alpha and beta, page 2 links
/// gamma and beta again
async fn mount_listing(server: &MockServer, expected_listing_fetches: u64) {
    let page_two = format!(
        "<ul>{}{}</ul>",
        product_card("gamma-taper"),
        product_card("beta-pump")
    );
    Mock::given(method("GET"))
        .and(path("/shop-all/"))
        .and(query_param("page", "2"))
        .respond_with(html(page_two))
        .expect(expected_listing_fetches)
        .mount(server)
        .await;

    let page_one = format!(
        r#"<ul>{}{}</ul><ul class="pagination"><li><a href="/shop-all/?page=2">2</a></li></ul>"#,
        product_card("alpha-box"),
        product_card("beta-pump")
    );
    Mock::given(method("GET"))
        .and(path("/shop-all/"))
        .respond_with(html(page_one))
        .expect(expected_listing_fetches)
        .mount(server)
        .await;
}

async fn mount_product(server: &MockServer, slug: &str, page: String, expected: u64) {
    Mock::given(method("GET"))
        .and(path(format!("/{}/", slug)))
        .respond_with(html(page))
        .expect(expected)
        .mount(server)
        .await;
}

async fn run(config: Config, fresh: bool) -> Result<catalog_scraper::output::RunStatistics, ScrapeError> {
    let mut coordinator = Coordinator::new(config, fresh)?;
    coordinator.run().await
}

fn stored(output: &TempDir) -> Vec<Product> {
    read_records(&output.path().join("catalog.jsonl")).unwrap()
}

#[tokio::test]
async fn test_listing_crawl_end_to_end() {
    let server = MockServer::start().await;
    let output = TempDir::new().unwrap();

    mount_listing(&server, 1).await;
    mount_product(&server, "alpha-box", product_page("Alpha Box", "AB-1", "$120.00"), 1).await;
    mount_product(&server, "beta-pump", product_page("Beta Pump", "BP-2", "$1,299.99"), 1).await;
    mount_product(&server, "gamma-taper", product_page("Gamma Taper", "GT-3", "$45"), 1).await;

    let config = create_test_config(
        format!("{}/shop-all/", server.uri()),
        DiscoveryMode::Listing,
        &output,
    );
    let stats = run(config, false).await.unwrap();

    assert_eq!(stats.listing_pages, 2);
    assert_eq!(stats.discovered, 3);
    assert_eq!(stats.succeeded, 3);
    assert_eq!(stats.failed, 0);

    let records = stored(&output);
    let names: Vec<&str> = records.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["Alpha Box", "Beta Pump", "Gamma Taper"]);

    let beta = &records[1];
    assert_eq!(beta.url, format!("{}/beta-pump/", server.uri()));
    assert_eq!(beta.sku, "BP-2");
    assert_eq!(beta.brand, "Acme");
    assert_eq!(beta.price_numeric, Some(1299.99));
    assert_eq!(beta.category, "Tapers");
    assert!(beta.in_stock);
    assert_eq!(
        beta.images,
        vec![format!("{}/stencil/1280x1280/products/9/BP-2.jpg", server.uri())]
    );

    let checkpoint = CrawlCheckpoint::load(&output.path().join("catalog_progress.json")).unwrap();
    assert_eq!(checkpoint.len(), 3);

    let mut table = csv::Reader::from_path(output.path().join("catalog.csv")).unwrap();
    let headers = table.headers().unwrap().clone();
    assert_eq!(&headers[0], "name");
    assert_eq!(&headers[7], "price_numeric");
    let rows: Vec<csv::StringRecord> = table.records().map(|r| r.unwrap()).collect();
    assert_eq!(rows.len(), 3);
    assert_eq!(&rows[1][1], "BP-2");

    let catalog: Vec<Product> =
        serde_json::from_str(&fs::read_to_string(output.path().join("catalog.json")).unwrap())
            .unwrap();
    assert_eq!(catalog, records);
}

#[tokio::test]
async fn test_resume_refetches_nothing() {
    let server = MockServer::start().await;
    let output = TempDir::new().unwrap();

    // Listing is fetched by both runs, each product only by the first
    mount_listing(&server, 2).await;
    mount_product(&server, "alpha-box", product_page("Alpha Box", "AB-1", "$1"), 1).await;
    mount_product(&server, "beta-pump", product_page("Beta Pump", "BP-2", "$2"), 1).await;
    mount_product(&server, "gamma-taper", product_page("Gamma Taper", "GT-3", "$3"), 1).await;

    let start = format!("{}/shop-all/", server.uri());
    run(create_test_config(start.clone(), DiscoveryMode::Listing, &output), false)
        .await
        .unwrap();
    let before = fs::read_to_string(output.path().join("catalog.jsonl")).unwrap();

    let second = run(create_test_config(start, DiscoveryMode::Listing, &output), false)
        .await
        .unwrap();

    assert_eq!(second.already_completed, 3);
    assert_eq!(second.succeeded, 0);
    let after = fs::read_to_string(output.path().join("catalog.jsonl")).unwrap();
    assert_eq!(before, after);
}

#[tokio::test]
async fn test_failed_product_is_retried_next_run() {
    let server = MockServer::start().await;
    let output = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/shop-all/"))
        .respond_with(html(format!(
            "{}{}",
            product_card("broken-box"),
            product_card("sound-pump")
        )))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/broken-box/"))
        .respond_with(ResponseTemplate::new(503))
        .expect(2)
        .mount(&server)
        .await;
    mount_product(&server, "sound-pump", product_page("Sound Pump", "SP-1", "$10"), 1).await;

    let config = create_test_config(
        format!("{}/shop-all/", server.uri()),
        DiscoveryMode::Listing,
        &output,
    );
    let stats = run(config, false).await.unwrap();

    assert_eq!(stats.failed, 1);
    assert_eq!(stats.succeeded, 1);

    let checkpoint = CrawlCheckpoint::load(&output.path().join("catalog_progress.json")).unwrap();
    assert!(!checkpoint.is_completed(&format!("{}/broken-box/", server.uri())));
    assert!(checkpoint.is_completed(&format!("{}/sound-pump/", server.uri())));

    let records = stored(&output);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].name, "Sound Pump");
}

#[tokio::test]
async fn test_transient_error_is_retried() {
    let server = MockServer::start().await;
    let output = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/shop-all/"))
        .respond_with(html(product_card("flaky-knife")))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/flaky-knife/"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    mount_product(&server, "flaky-knife", product_page("Flaky Knife", "FK-1", "$8"), 1).await;

    let config = create_test_config(
        format!("{}/shop-all/", server.uri()),
        DiscoveryMode::Listing,
        &output,
    );
    let stats = run(config, false).await.unwrap();

    assert_eq!(stats.succeeded, 1);
    assert_eq!(stored(&output)[0].name, "Flaky Knife");
}

#[tokio::test]
async fn test_not_found_is_not_retried() {
    let server = MockServer::start().await;
    let output = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/shop-all/"))
        .respond_with(html(product_card("missing-item")))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/missing-item/"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let config = create_test_config(
        format!("{}/shop-all/", server.uri()),
        DiscoveryMode::Listing,
        &output,
    );
    let stats = run(config, false).await.unwrap();
    assert_eq!(stats.failed, 1);
}

#[tokio::test]
async fn test_listing_seed_failure_aborts() {
    let server = MockServer::start().await;
    let output = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/shop-all/"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&server)
        .await;

    let config = create_test_config(
        format!("{}/shop-all/", server.uri()),
        DiscoveryMode::Listing,
        &output,
    );
    let result = run(config, false).await;

    match result {
        Err(ScrapeError::SeedFetch(failure)) => {
            assert_eq!(failure.attempts, 2);
            assert_eq!(failure.last_error, "HTTP 500");
        }
        other => panic!("expected seed fetch failure, got {:?}", other.map(|s| s.succeeded)),
    }
}

#[tokio::test]
async fn test_fresh_start_refetches_everything() {
    let server = MockServer::start().await;
    let output = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/shop-all/"))
        .respond_with(html(product_card("alpha-box")))
        .expect(2)
        .mount(&server)
        .await;
    mount_product(&server, "alpha-box", product_page("Alpha Box", "AB-1", "$1"), 2).await;

    let start = format!("{}/shop-all/", server.uri());
    run(create_test_config(start.clone(), DiscoveryMode::Listing, &output), false)
        .await
        .unwrap();
    let stats = run(create_test_config(start, DiscoveryMode::Listing, &output), true)
        .await
        .unwrap();

    assert_eq!(stats.succeeded, 1);
    assert_eq!(stored(&output).len(), 1);
}

#[tokio::test]
async fn test_site_crawl_extracts_product_pages() {
    let server = MockServer::start().await;
    let output = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(
            r#"<html><body>
                <a href="/about">About</a>
                <a href="/tools/banjo#specs">Banjo</a>
                <a href="/catalog.pdf">Catalog</a>
                <a href="https://elsewhere.example.com/">Partner</a>
            </body></html>"#
                .to_string(),
        ))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/about"))
        .respond_with(html(
            r#"<html><body><h1>About us</h1><a href="/">Home</a><a href="/tools/banjo/">Banjo</a></body></html>"#
                .to_string(),
        ))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/tools/banjo"))
        .respond_with(html(product_page("Banjo Taper", "BT-9", "$399.00")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/catalog.pdf"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let config = create_test_config(format!("{}/", server.uri()), DiscoveryMode::Site, &output);
    let stats = run(config, false).await.unwrap();

    assert_eq!(stats.pages_visited, 3);
    assert_eq!(stats.succeeded, 1);

    let records = stored(&output);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].name, "Banjo Taper");
    assert_eq!(records[0].url, format!("{}/tools/banjo", server.uri()));
}

#[tokio::test]
async fn test_site_seed_failure_aborts() {
    let server = MockServer::start().await;
    let output = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let config = create_test_config(format!("{}/", server.uri()), DiscoveryMode::Site, &output);
    assert!(matches!(
        run(config, false).await,
        Err(ScrapeError::SeedFetch(_))
    ));
}

#[tokio::test]
async fn test_site_resume_discovers_links_behind_stored_pages() {
    let server = MockServer::start().await;
    let output = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(r#"<a href="/tools/banjo">Banjo</a>"#.to_string()))
        .expect(2)
        .mount(&server)
        .await;
    // Stored by the first run, fetched again by the second for its links
    Mock::given(method("GET"))
        .and(path("/tools/banjo"))
        .respond_with(html(product_page("Banjo Taper", "BT-9", "$399.00").replace(
            "</body>",
            r#"<a href="/tools/plane">Related</a></body>"#,
        )))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/tools/plane"))
        .respond_with(ResponseTemplate::new(404))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/tools/plane"))
        .respond_with(html(product_page("Hand Plane", "HP-2", "$89.00")))
        .expect(1)
        .mount(&server)
        .await;

    let start = format!("{}/", server.uri());
    let first = run(create_test_config(start.clone(), DiscoveryMode::Site, &output), false)
        .await
        .unwrap();
    assert_eq!(first.succeeded, 1);
    assert_eq!(first.failed, 0);

    let second = run(create_test_config(start, DiscoveryMode::Site, &output), false)
        .await
        .unwrap();

    assert_eq!(second.already_completed, 1);
    assert_eq!(second.succeeded, 1);
    let names: Vec<String> = stored(&output).into_iter().map(|p| p.name).collect();
    assert_eq!(names, vec!["Banjo Taper", "Hand Plane"]);
}

#[tokio::test]
async fn test_restart_after_lost_checkpoint_does_not_duplicate() {
    let server = MockServer::start().await;
    let output = TempDir::new().unwrap();

    mount_listing(&server, 2).await;
    mount_product(&server, "alpha-box", product_page("Alpha Box", "AB-1", "$1"), 1).await;
    mount_product(&server, "beta-pump", product_page("Beta Pump", "BP-2", "$2"), 1).await;
    mount_product(&server, "gamma-taper", product_page("Gamma Taper", "GT-3", "$3"), 1).await;

    let start = format!("{}/shop-all/", server.uri());
    run(create_test_config(start.clone(), DiscoveryMode::Listing, &output), false)
        .await
        .unwrap();

    // Records reached disk but the checkpoint never did
    fs::remove_file(output.path().join("catalog_progress.json")).unwrap();

    let second = run(create_test_config(start, DiscoveryMode::Listing, &output), false)
        .await
        .unwrap();

    assert_eq!(second.already_completed, 3);
    assert_eq!(second.succeeded, 0);
    assert_eq!(stored(&output).len(), 3);

    let checkpoint = CrawlCheckpoint::load(&output.path().join("catalog_progress.json")).unwrap();
    assert_eq!(checkpoint.len(), 3);
}

#[tokio::test]
async fn test_product_images_are_downloaded_once() {
    let server = MockServer::start().await;
    let output = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/shop-all/"))
        .respond_with(html(product_card("alpha-box")))
        .expect(2)
        .mount(&server)
        .await;
    mount_product(&server, "alpha-box", product_page("Alpha Box", "AB-1", "$1"), 2).await;
    Mock::given(method("GET"))
        .and(path("/stencil/1280x1280/products/9/AB-1.jpg"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"jpeg".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let start = format!("{}/shop-all/", server.uri());
    let mut config = create_test_config(start, DiscoveryMode::Listing, &output);
    config.output.download_images = true;

    let stats = run(config.clone(), false).await.unwrap();
    assert_eq!(stats.images_downloaded, 1);

    let image_url =
        url::Url::parse(&format!("{}/stencil/1280x1280/products/9/AB-1.jpg", server.uri())).unwrap();
    let saved = output
        .path()
        .join("catalog_images")
        .join(image_file_name(&image_url));
    assert_eq!(fs::read(&saved).unwrap(), b"jpeg");

    // Re-storing the product finds the file already on disk
    let stats = run(config, true).await.unwrap();
    assert_eq!(stats.succeeded, 1);
    assert_eq!(stats.images_downloaded, 0);
    assert!(saved.exists());
}
