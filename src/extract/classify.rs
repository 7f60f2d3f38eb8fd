//! Product page classification for whole-site traversal
//!
//! A page counts as a product page when ANY enabled signal fires. The broad
//! class-name signals (`price-class` in particular) also fire on pages that
//! merely embed a cart or price widget in a shared header, so the default
//! policy over-accepts; such pages then usually fail extraction and are
//! counted as failures. Narrow the policy through `[classifier]` if that is
//! too noisy for a given site.

use crate::config::{ClassifierConfig, ProductSignal};
use crate::extract::text::{class_matches, id_matches, select_all};
use regex::Regex;
use scraper::Html;
use std::sync::LazyLock;
use url::Url;

static RE_PRODUCT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)product").expect("product regex"));

static RE_PRICE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)price").expect("price regex"));

static RE_SKU: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)sku").expect("sku regex"));

/// Decides whether a fetched page should go through field extraction
#[derive(Debug, Clone)]
pub struct PageClassifier {
    policy: ClassifierConfig,
}

impl PageClassifier {
    pub fn new(policy: ClassifierConfig) -> Self {
        Self { policy }
    }

    /// Returns the first signal that fires for this page, if any
    pub fn matching_signal(&self, document: &Html, url: &Url) -> Option<ProductSignal> {
        self.policy
            .signals
            .iter()
            .copied()
            .find(|signal| self.signal_fires(*signal, document, url))
    }

    /// Returns true if the page looks like a product page
    pub fn is_product_page(&self, document: &Html, url: &Url) -> bool {
        self.matching_signal(document, url).is_some()
    }

    fn signal_fires(&self, signal: ProductSignal, document: &Html, url: &Url) -> bool {
        match signal {
            ProductSignal::ProductClass => any_class(document, &RE_PRODUCT),
            ProductSignal::ProductId => select_all(document, "[id]")
                .into_iter()
                .any(|el| id_matches(el, &RE_PRODUCT)),
            ProductSignal::ProductMicrodata => select_all(document, "[itemtype]")
                .into_iter()
                .filter_map(|el| el.value().attr("itemtype"))
                .any(|t| RE_PRODUCT.is_match(t)),
            ProductSignal::PriceClass => any_class(document, &RE_PRICE),
            ProductSignal::SkuClass => any_class(document, &RE_SKU),
            ProductSignal::OgProduct => {
                !select_all(document, r#"meta[property="og:type"][content="product"]"#).is_empty()
            }
            ProductSignal::UrlMarker => {
                let url = url.as_str().to_lowercase();
                self.policy
                    .url_markers
                    .iter()
                    .map(|m| m.trim().to_lowercase())
                    .any(|m| !m.is_empty() && url.contains(&m))
            }
        }
    }
}

impl Default for PageClassifier {
    fn default() -> Self {
        Self::new(ClassifierConfig::default())
    }
}

fn any_class(document: &Html, pattern: &Regex) -> bool {
    select_all(document, "[class]")
        .into_iter()
        .any(|el| class_matches(el, pattern))
}
