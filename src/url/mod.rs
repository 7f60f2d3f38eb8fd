//! URL handling module for Catalog-Scraper
//!
//! This module provides URL normalization, visited-set keys, same-site checks
//! and listing-page URL synthesis. Everything here is pure; no I/O.

mod domain;
mod listing;
mod normalize;

pub use domain::{extract_domain, is_same_site};
pub use listing::{build_listing_page_url, PAGE_PARAM};
pub use normalize::{normalize_url, visit_key, with_trailing_slash};
