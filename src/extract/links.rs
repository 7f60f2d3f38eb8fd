//! Product link discovery on listing pages
//!
//! Anchors are classified as product links by a chain of structural checks.
//! The cheap denylist runs first; the image check (which may fall back to the
//! anchor's container) only runs for anchors that survive it.

use crate::extract::text::{class_matches, select_all, select_within};
use crate::url::{is_same_site, with_trailing_slash};
use indexmap::IndexSet;
use regex::Regex;
use scraper::{ElementRef, Html};
use std::sync::LazyLock;
use url::Url;

/// Path fragments that never belong to a product page
const DENYLIST: &[&str] = &[
    "cart.php",
    "compare",
    "/login",
    "/wishlist",
    "javascript:",
    "mailto:",
    "/shop-by-product",
    "/brands",
    "/order-parts",
    "/cart",
    "/category/",
];

/// Shortest slug accepted as a product page
const MIN_SLUG_LEN: usize = 4;

static RE_PAGE_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[?&]page=(\d+)").expect("page token regex"));

static RE_PAGINATION_CLASS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)paginat|paging").expect("pagination class regex"));

/// Extracts product page URLs from a listing page
///
/// Returns absolute URLs ending in `/`, de-duplicated, in first-seen order.
///
/// # Arguments
///
/// * `html` - The listing page content
/// * `base_url` - URL of the listing page, used to resolve relative links
///
/// # Example
///
/// ```
/// use catalog_scraper::extract_product_links;
/// use url::Url;
///
/// let html = r#"<a href="/banjo-taper"><img src="/products/1/banjo.jpg"></a>"#;
/// let base = Url::parse("https://shop.example.com/all/").unwrap();
/// assert_eq!(
///     extract_product_links(html, &base),
///     vec!["https://shop.example.com/banjo-taper/".to_string()]
/// );
/// ```
pub fn extract_product_links(html: &str, base_url: &Url) -> Vec<String> {
    let document = Html::parse_document(html);
    let mut products: IndexSet<String> = IndexSet::new();

    for anchor in select_all(&document, "a[href]") {
        let Some(href) = anchor.value().attr("href").map(str::trim) else {
            continue;
        };

        if href.is_empty() || is_denied(href) {
            continue;
        }

        if !has_product_image(anchor) {
            continue;
        }

        let Some(url) = resolve_product_url(href, base_url) else {
            tracing::trace!("Rejected product candidate {}", href);
            continue;
        };

        products.insert(url);
    }

    products.into_iter().collect()
}

/// Returns the highest listing page number advertised on a page
///
/// Looks for `page=N` tokens in link query strings first; when none are
/// found, scans the first pagination widget for purely numeric labels.
/// Returns 1 when the page shows no pagination at all.
pub fn find_max_listing_page(html: &str) -> u32 {
    let document = Html::parse_document(html);

    let from_links = select_all(&document, "a[href]")
        .into_iter()
        .filter_map(|a| a.value().attr("href"))
        .filter_map(|href| RE_PAGE_TOKEN.captures(href))
        .filter_map(|caps| caps.get(1)?.as_str().parse::<u32>().ok())
        .max()
        .unwrap_or(1)
        .max(1);

    if from_links > 1 {
        return from_links;
    }

    select_all(&document, "nav, ul, div")
        .into_iter()
        .find(|el| class_matches(*el, &RE_PAGINATION_CLASS))
        .map(|widget| {
            widget
                .text()
                .map(str::trim)
                .filter(|t| !t.is_empty() && t.chars().all(|c| c.is_ascii_digit()))
                .filter_map(|t| t.parse::<u32>().ok())
                .max()
                .unwrap_or(1)
        })
        .unwrap_or(1)
        .max(1)
}

fn is_denied(reference: &str) -> bool {
    DENYLIST.iter().any(|fragment| reference.contains(fragment))
}

/// True if the anchor, or failing that its container, shows a product image
fn has_product_image(anchor: ElementRef<'_>) -> bool {
    let image = select_within(anchor, "img").into_iter().next().or_else(|| {
        anchor
            .parent()
            .and_then(ElementRef::wrap)
            .and_then(|container| select_within(container, "img").into_iter().next())
    });

    let Some(image) = image else {
        return false;
    };

    let src = image.value().attr("src").unwrap_or_default();
    src.contains("/products/") || src.to_lowercase().contains("product")
}

/// Resolves a candidate href and checks it names a top-level product slug
fn resolve_product_url(href: &str, base_url: &Url) -> Option<String> {
    let mut url = base_url.join(href).ok()?;
    url.set_fragment(None);

    if !matches!(url.scheme(), "http" | "https") || !is_same_site(&url, base_url) {
        return None;
    }

    if is_denied(url.as_str()) {
        return None;
    }

    let path = url.path().trim_matches('/');
    if path.is_empty() {
        return None;
    }

    let mut segments = path.split('/');
    let slug = segments.next()?;
    if segments.next().is_some() {
        return None;
    }

    if slug.len() < MIN_SLUG_LEN || slug.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    Some(with_trailing_slash(&url))
}
