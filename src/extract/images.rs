//! Product image discovery
//!
//! Three independent sweeps run over the page and their results are unioned:
//!
//! 1. the main product image
//! 2. gallery links pointing at product image assets
//! 3. per-product thumbnails
//!
//! Every URL is promoted to its high-resolution variant before
//! de-duplication, so the same asset reached through different size variants
//! collapses to one entry.

use crate::extract::text::{class_matches, select_all};
use indexmap::IndexSet;
use regex::Regex;
use scraper::Html;
use std::sync::LazyLock;
use url::Url;

/// Path segment of the largest rendition served by the image CDN
pub const HIGH_RES_SEGMENT: &str = "/stencil/1280x1280/";

/// Marker proving a URL was upgraded to the high-resolution rendition
const HIGH_RES_MARKER: &str = "1280x1280";

static RE_SIZE_SEGMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/stencil/\d+x\d+/").expect("size segment regex"));

static RE_MAIN_IMAGE_CLASS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)product.*image|main").expect("main image regex"));

static RE_IMAGE_ASSET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\.(jpe?g|png|webp)").expect("image asset regex"));

static RE_PRODUCT_THUMBNAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/products/\d+/").expect("thumbnail regex"));

/// Rewrites a sized rendition path to the high-resolution one
///
/// URLs without a size segment are returned unchanged.
///
/// ```
/// use catalog_scraper::extract::upgrade_resolution;
///
/// assert_eq!(
///     upgrade_resolution("https://cdn.example.com/s-1/images/stencil/608x608/products/12/34/a.jpg"),
///     "https://cdn.example.com/s-1/images/stencil/1280x1280/products/12/34/a.jpg"
/// );
/// ```
pub fn upgrade_resolution(url: &str) -> String {
    RE_SIZE_SEGMENT
        .replace_all(url, HIGH_RES_SEGMENT)
        .into_owned()
}

/// Collects every product image URL on a page
pub fn collect_images(document: &Html, page_url: &Url) -> Vec<String> {
    let mut images: IndexSet<String> = IndexSet::new();

    // Main image: kept even when it has no size segment to upgrade
    if let Some(src) = select_all(document, "img")
        .into_iter()
        .find(|img| class_matches(*img, &RE_MAIN_IMAGE_CLASS))
        .and_then(|img| img.value().attr("src"))
    {
        if let Some(url) = resolve_asset(src, page_url) {
            images.insert(upgrade_resolution(&url));
        }
    }

    // Gallery links to full-size assets
    for link in select_all(document, "a[href]") {
        let Some(href) = link.value().attr("href") else {
            continue;
        };
        if !RE_IMAGE_ASSET.is_match(href) || !href.contains("products/") {
            continue;
        }
        if let Some(url) = resolve_asset(href, page_url) {
            images.insert(upgrade_resolution(&url));
        }
    }

    // Thumbnails: only kept if the upgrade actually applied
    for thumb in select_all(document, "img[src]") {
        let Some(src) = thumb.value().attr("src") else {
            continue;
        };
        if !RE_PRODUCT_THUMBNAIL.is_match(src) {
            continue;
        }
        if let Some(url) = resolve_asset(src, page_url) {
            let upgraded = upgrade_resolution(&url);
            if upgraded.contains(HIGH_RES_MARKER) {
                images.insert(upgraded);
            }
        }
    }

    images.into_iter().collect()
}

/// Collects images that generic storefronts expose outside the usual markup
///
/// Covers lazily loaded `<img data-src>` elements and the Open Graph image.
/// Site logos and icons are skipped.
pub fn collect_lazy_images(document: &Html, page_url: &Url) -> Vec<String> {
    let lazy = select_all(document, "img[data-src]")
        .into_iter()
        .filter_map(|img| img.value().attr("data-src"));
    let og = select_all(document, r#"meta[property="og:image"]"#)
        .into_iter()
        .filter_map(|meta| meta.value().attr("content"));

    let mut images: IndexSet<String> = IndexSet::new();
    for reference in lazy.chain(og) {
        let Some(url) = resolve_asset(reference, page_url) else {
            continue;
        };
        let lower = url.to_lowercase();
        if lower.contains("logo") || lower.contains("icon") {
            continue;
        }
        images.insert(upgrade_resolution(&url));
    }

    images.into_iter().collect()
}

/// Resolves an asset reference against the page URL, keeping http(s) only
fn resolve_asset(reference: &str, page_url: &Url) -> Option<String> {
    let reference = reference.trim();
    if reference.is_empty() {
        return None;
    }

    let absolute = page_url.join(reference).ok()?;
    match absolute.scheme() {
        "http" | "https" => Some(absolute.to_string()),
        _ => None,
    }
}
