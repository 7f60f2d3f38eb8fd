use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Browser-like identity sent with every request
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Main configuration structure for Catalog-Scraper
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub fetcher: FetcherConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
}

/// How product URLs are discovered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiscoveryMode {
    /// Walk every page of a paginated listing
    #[default]
    Listing,
    /// Breadth-first traversal of the whole site from a seed URL
    Site,
}

impl DiscoveryMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Listing => "listing",
            Self::Site => "site",
        }
    }
}

impl std::str::FromStr for DiscoveryMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "listing" => Ok(Self::Listing),
            "site" => Ok(Self::Site),
            other => Err(format!("unknown discovery mode '{}'", other)),
        }
    }
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CrawlerConfig {
    /// Discovery strategy; never mixed within a run
    pub mode: DiscoveryMode,

    /// Listing URL (listing mode) or seed URL (site mode)
    pub start_url: String,

    /// Pause between consecutive fetches (milliseconds)
    pub delay_ms: u64,

    /// Upper bound on pages fetched during a whole-site traversal
    pub max_site_pages: Option<usize>,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            mode: DiscoveryMode::Listing,
            start_url: String::new(),
            delay_ms: 2000,
            max_site_pages: None,
        }
    }
}

/// HTTP fetcher configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct FetcherConfig {
    /// Total attempts per URL, including the first one
    pub max_retries: u32,

    /// Base delay for exponential backoff (milliseconds)
    pub base_backoff_ms: u64,

    /// Per-request timeout (seconds)
    pub timeout_secs: u64,

    /// User-Agent header value
    pub user_agent: String,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_backoff_ms: 1000,
            timeout_secs: 30,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Directory receiving every output file
    pub directory: String,

    /// Common file name stem for the stores and the checkpoint
    pub stem: String,

    /// Number of dedicated image columns in the CSV store
    pub image_columns: usize,

    /// Rebuild the aggregate JSON document at the end of each run
    pub materialize_json: bool,

    /// Save each stored product's images next to the catalog
    pub download_images: bool,

    /// Most images saved per product when downloading
    pub images_per_product: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: "./output".to_string(),
            stem: "catalog".to_string(),
            image_columns: 9,
            materialize_json: true,
            download_images: false,
            images_per_product: 5,
        }
    }
}

impl OutputConfig {
    /// Resolves the concrete file paths for this output configuration
    pub fn paths(&self) -> OutputPaths {
        OutputPaths::new(Path::new(&self.directory), &self.stem)
    }
}

/// Concrete locations of every file a run reads or writes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    /// Line-delimited record store (primary, append-only)
    pub records: PathBuf,
    /// Tabular CSV store
    pub table: PathBuf,
    /// Aggregate array-of-records document
    pub catalog: PathBuf,
    /// Checkpoint of completed URLs
    pub checkpoint: PathBuf,
    /// Directory receiving downloaded product images
    pub images: PathBuf,
}

impl OutputPaths {
    pub fn new(directory: &Path, stem: &str) -> Self {
        Self {
            records: directory.join(format!("{}.jsonl", stem)),
            table: directory.join(format!("{}.csv", stem)),
            catalog: directory.join(format!("{}.json", stem)),
            checkpoint: directory.join(format!("{}_progress.json", stem)),
            images: directory.join(format!("{}_images", stem)),
        }
    }
}

/// One signal of the whole-site "is this a product page" heuristic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProductSignal {
    /// Any element with a product-flavored class
    ProductClass,
    /// Any element with a product-flavored id
    ProductId,
    /// Microdata `itemtype` naming a Product
    ProductMicrodata,
    /// Any element with a price-flavored class
    PriceClass,
    /// Any element with a sku-flavored class
    SkuClass,
    /// `<meta property="og:type" content="product">`
    OgProduct,
    /// The URL path contains one of the configured markers
    UrlMarker,
}

/// Whole-site product page classification policy
///
/// The default enables every signal, which accepts any page carrying a
/// price-flavored class anywhere (a cart widget in a shared header is enough).
/// Disable signals here to trade recall for precision.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ClassifierConfig {
    pub signals: Vec<ProductSignal>,
    pub url_markers: Vec<String>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            signals: vec![
                ProductSignal::ProductClass,
                ProductSignal::ProductId,
                ProductSignal::ProductMicrodata,
                ProductSignal::PriceClass,
                ProductSignal::SkuClass,
                ProductSignal::OgProduct,
                ProductSignal::UrlMarker,
            ],
            url_markers: vec![
                "product".to_string(),
                "/p/".to_string(),
                "/item/".to_string(),
            ],
        }
    }
}
