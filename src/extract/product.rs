//! Product field extraction
//!
//! Every field degrades independently to its empty value; extraction only
//! fails when the page yields no name, no price and no images at all.

use crate::extract::cascade::{Cascade, Locate, Read, Strategy};
use crate::extract::images::{collect_images, collect_lazy_images};
use crate::extract::price::parse_price;
use crate::extract::text::{element_text, select_all, select_within, truncate_chars, visible_text};
use crate::model::{ExtractionFailure, Product, SHORT_DESCRIPTION_LIMIT};
use regex::Regex;
use scraper::Html;
use std::sync::LazyLock;
use url::Url;

static RE_TITLE_SITE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)productView-title").expect("title regex"));
static RE_TITLE_GENERIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)product|title").expect("generic title regex"));
static RE_SKU_VALUE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)productView-info-value--sku").expect("sku regex"));
static RE_UPC_VALUE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)productView-info-value--upc").expect("upc regex"));
static RE_MPN_VALUE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)productView-info-value--mpn").expect("mpn regex"));
static RE_PRICE_MAIN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)price--main").expect("main price regex"));
static RE_PRICE_ANY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)price").expect("price regex"));
static RE_BRAND: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)productView-brand").expect("brand regex"));
static RE_DESCRIPTION_PANEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)productView-description-tabContent").expect("description panel regex")
});
static RE_DESCRIPTION_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^tab-description$").expect("description id regex"));
static RE_DESCRIPTION_GENERIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)description|detail").expect("description regex"));
static RE_SPEC_PANEL_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^tab-addition$").expect("spec panel regex"));
static RE_BREADCRUMB: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)breadcrumb").expect("breadcrumb regex"));
static RE_STOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)in stock|out of stock").expect("stock regex"));

/// Separator between text blocks of the full description
const DESCRIPTION_SEPARATOR: &str = "\n\n";

/// The ordered selector cascades used for each field
///
/// The defaults target storefront themes that expose `productView-*`
/// classes, then fall back to generic class names. Reorder or replace the
/// strategies to tune precedence for another site.
#[derive(Debug, Clone)]
pub struct ExtractionProfile {
    pub name: Cascade,
    pub sku: Cascade,
    pub upc: Cascade,
    pub mpn: Cascade,
    pub price: Cascade,
    pub brand: Cascade,
    pub description: Cascade,
    pub specifications: Cascade,
    pub breadcrumb: Cascade,

    /// Plain-text description used when no description panel is found
    pub description_fallback: Cascade,

    /// Also sweep lazily loaded and Open Graph images
    pub lazy_images: bool,
}

impl Default for ExtractionProfile {
    fn default() -> Self {
        Self {
            name: Cascade::new(vec![
                Strategy::new(
                    "site-title",
                    Locate::ClassOn {
                        tags: &["h1"],
                        class: &RE_TITLE_SITE,
                    },
                    Read::Text,
                ),
                Strategy::new(
                    "generic-title",
                    Locate::ClassOn {
                        tags: &["h1"],
                        class: &RE_TITLE_GENERIC,
                    },
                    Read::Text,
                ),
                Strategy::new("first-h1", Locate::Css("h1"), Read::Text),
            ]),
            sku: Cascade::new(vec![
                Strategy::new(
                    "sku-value",
                    Locate::ClassOn {
                        tags: &["dd"],
                        class: &RE_SKU_VALUE,
                    },
                    Read::AttrOrText(&["data-product-sku"]),
                ),
                Strategy::new(
                    "sku-microdata",
                    Locate::Css(r#"[itemprop="sku"]"#),
                    Read::AttrOrText(&["content"]),
                ),
            ]),
            upc: Cascade::new(vec![Strategy::new(
                "upc-value",
                Locate::ClassOn {
                    tags: &["dd"],
                    class: &RE_UPC_VALUE,
                },
                Read::AttrOrText(&["data-product-upc"]),
            )]),
            mpn: Cascade::new(vec![
                Strategy::new(
                    "mpn-value",
                    Locate::ClassOn {
                        tags: &["dd"],
                        class: &RE_MPN_VALUE,
                    },
                    Read::AttrOrText(&["data-product-mpn", "data-original-mpn"]),
                ),
                Strategy::new(
                    "mpn-microdata",
                    Locate::Css(r#"[itemprop="mpn"]"#),
                    Read::AttrOrText(&["content"]),
                ),
            ]),
            price: Cascade::new(vec![
                Strategy::new(
                    "main-price",
                    Locate::ClassOn {
                        tags: &["span"],
                        class: &RE_PRICE_MAIN,
                    },
                    Read::Text,
                ),
                Strategy::new(
                    "any-price",
                    Locate::ClassOn {
                        tags: &["span", "div"],
                        class: &RE_PRICE_ANY,
                    },
                    Read::Text,
                ),
            ]),
            // No generic fallback: a stray link in some h5 is not a brand
            brand: Cascade::new(vec![Strategy::new(
                "brand-heading",
                Locate::ClassOn {
                    tags: &["h5"],
                    class: &RE_BRAND,
                },
                Read::FirstLinkText,
            )]),
            description: Cascade::new(vec![
                Strategy::new(
                    "description-panel",
                    Locate::ClassOn {
                        tags: &["div"],
                        class: &RE_DESCRIPTION_PANEL,
                    },
                    Read::Text,
                ),
                Strategy::new(
                    "description-tab",
                    Locate::IdOn {
                        tags: &["div"],
                        id: &RE_DESCRIPTION_ID,
                    },
                    Read::Text,
                ),
                Strategy::new(
                    "description-generic",
                    Locate::ClassOn {
                        tags: &["div", "section"],
                        class: &RE_DESCRIPTION_GENERIC,
                    },
                    Read::Text,
                ),
            ]),
            specifications: Cascade::new(vec![Strategy::new(
                "spec-tab",
                Locate::IdOn {
                    tags: &["div"],
                    id: &RE_SPEC_PANEL_ID,
                },
                Read::Text,
            )]),
            breadcrumb: Cascade::new(vec![Strategy::new(
                "breadcrumb",
                Locate::ClassOn {
                    tags: &["nav", "div", "ol", "ul"],
                    class: &RE_BREADCRUMB,
                },
                Read::Text,
            )]),
            description_fallback: Cascade::default(),
            lazy_images: false,
        }
    }
}

impl ExtractionProfile {
    /// Profile for pages reached by whole-site traversal
    ///
    /// Extends the defaults with fallbacks for storefronts that do not use
    /// the `productView-*` markup: the document title as name, microdata and
    /// Open Graph prices, the meta description, and lazy or Open Graph images.
    /// Every added strategy runs after the default ones.
    pub fn site() -> Self {
        let mut profile = Self::default();

        profile
            .name
            .strategies
            .push(Strategy::new("page-title", Locate::Css("title"), Read::TitleText));
        profile.price.strategies.extend([
            Strategy::new(
                "price-microdata",
                Locate::Css(r#"[itemprop="price"]"#),
                Read::AttrOrText(&["content"]),
            ),
            Strategy::new(
                "og-price",
                Locate::Css(r#"meta[property="og:price:amount"]"#),
                Read::AttrOrText(&["content"]),
            ),
        ]);
        profile.description_fallback = Cascade::new(vec![
            Strategy::new(
                "description-microdata",
                Locate::Css(r#"[itemprop="description"]"#),
                Read::AttrOrText(&["content"]),
            ),
            Strategy::new(
                "meta-description",
                Locate::Css(r#"meta[name="description"]"#),
                Read::AttrOrText(&["content"]),
            ),
        ]);
        profile.lazy_images = true;

        profile
    }
}

/// Turns one product page into a [`Product`]
#[derive(Debug, Clone, Default)]
pub struct ProductExtractor {
    profile: ExtractionProfile,
}

impl ProductExtractor {
    pub fn new(profile: ExtractionProfile) -> Self {
        Self { profile }
    }

    pub fn profile(&self) -> &ExtractionProfile {
        &self.profile
    }

    /// Extracts a product record from page content
    ///
    /// # Arguments
    ///
    /// * `html` - The product page content
    /// * `url` - Canonical URL of the page; used as the record key and to
    ///   resolve relative image links
    ///
    /// # Returns
    ///
    /// * `Ok(Product)` - At least one of name, price or images was found
    /// * `Err(ExtractionFailure::NotAProduct)` - None of them were found
    pub fn extract(&self, html: &str, url: &Url) -> Result<Product, ExtractionFailure> {
        self.extract_document(&Html::parse_document(html), url)
    }

    /// Same as [`extract`](Self::extract) for an already parsed page
    pub fn extract_document(
        &self,
        document: &Html,
        url: &Url,
    ) -> Result<Product, ExtractionFailure> {
        let mut product = Product::new(url.as_str());
        let profile = &self.profile;

        product.name = profile.name.value(document).unwrap_or_default();
        product.sku = profile.sku.value(document).unwrap_or_default();
        product.upc = profile.upc.value(document).unwrap_or_default();
        product.mpn = profile.mpn.value(document).unwrap_or_default();

        product.price_display = profile.price.value(document).unwrap_or_default();
        product.price_numeric = parse_price(&product.price_display);

        product.brand = profile.brand.value(document).unwrap_or_default();
        product.manufacturer = product.brand.clone();

        product.in_stock = stock_status(document);

        self.fill_description(document, &mut product);
        self.fill_specifications(document, &mut product);

        product.images = collect_images(document, url);
        if self.profile.lazy_images {
            for image in collect_lazy_images(document, url) {
                if !product.images.contains(&image) {
                    product.images.push(image);
                }
            }
        }
        product.category = self.category(document).unwrap_or_default();

        if product.is_empty_extraction() {
            return Err(ExtractionFailure::NotAProduct);
        }

        Ok(product)
    }

    fn fill_description(&self, document: &Html, product: &mut Product) {
        let Some(panel) = self.profile.description.element(document) else {
            self.fill_description_fallback(document, product);
            return;
        };

        product.description_full = visible_text(panel, DESCRIPTION_SEPARATOR);
        product.description_short = match select_within(panel, "p").into_iter().next() {
            Some(paragraph) => {
                truncate_chars(&visible_text(paragraph, " "), SHORT_DESCRIPTION_LIMIT)
            }
            None => truncate_chars(&product.description_full, SHORT_DESCRIPTION_LIMIT),
        };
    }

    fn fill_description_fallback(&self, document: &Html, product: &mut Product) {
        if let Some(text) = self.profile.description_fallback.value(document) {
            product.description_short = truncate_chars(&text, SHORT_DESCRIPTION_LIMIT);
            product.description_full = text;
        }
    }

    fn fill_specifications(&self, document: &Html, product: &mut Product) {
        let Some(panel) = self.profile.specifications.element(document) else {
            return;
        };
        let Some(table) = select_within(panel, "table").into_iter().next() else {
            return;
        };

        for row in select_within(table, "tr") {
            let cells = select_within(row, "td, th");
            if cells.len() < 2 {
                continue;
            }

            let key = element_text(cells[0]);
            let value = element_text(cells[1]);
            if !key.is_empty() && !value.is_empty() {
                product.specifications.insert(key, value);
            }
        }
    }

    fn category(&self, document: &Html) -> Option<String> {
        let trail = self.profile.breadcrumb.element(document)?;
        let links = select_within(trail, "a");
        if links.len() > 1 {
            links.last().map(|link| element_text(*link))
        } else {
            None
        }
    }
}

/// Stock status from the first "in stock" / "out of stock" text on the page
///
/// Absence of any indicator is not evidence of stock.
fn stock_status(document: &Html) -> bool {
    document
        .root_element()
        .descendants()
        .filter_map(|node| node.value().as_text().map(|t| t.to_string()))
        .find(|text| RE_STOCK.is_match(text))
        .is_some_and(|text| text.to_lowercase().contains("in stock"))
}
