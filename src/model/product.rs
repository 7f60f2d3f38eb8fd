use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Maximum length of `description_short`, in characters
pub const SHORT_DESCRIPTION_LIMIT: usize = 500;

/// A single product record
///
/// The schema is flat so it maps onto CSV columns directly: missing
/// identifiers are empty strings rather than absent, and the specification
/// map never contains empty keys or values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// Canonical absolute URL; the unique key for dedup and checkpointing
    pub url: String,

    pub name: String,

    pub sku: String,
    pub upc: String,
    pub mpn: String,
    pub brand: String,

    /// Same value as `brand`; kept for catalog consumers that expect it
    #[serde(default)]
    pub manufacturer: String,

    /// Price text exactly as shown on the page
    pub price_display: String,

    /// Best-effort numeric price parsed from `price_display`
    pub price_numeric: Option<f64>,

    pub description_short: String,
    pub description_full: String,

    /// Label -> value pairs in page order
    #[serde(default)]
    pub specifications: IndexMap<String, String>,

    /// Absolute image URLs, de-duplicated, in discovery order
    #[serde(default)]
    pub images: Vec<String>,

    /// False unless the page explicitly says "in stock"
    #[serde(default)]
    pub in_stock: bool,

    /// Last breadcrumb label, empty if the page has no breadcrumb trail
    #[serde(default)]
    pub category: String,
}

impl Product {
    /// Creates an empty record for the given URL
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Returns true if none of the primary fields were found
    ///
    /// A record with no name, no price text and no images means the page was
    /// not a real product page; it must be counted as a failure, never
    /// persisted.
    pub fn is_empty_extraction(&self) -> bool {
        self.name.is_empty() && self.price_display.is_empty() && self.images.is_empty()
    }
}
