//! HTML extraction
//!
//! This module contains everything that reads page content:
//! - Product link discovery and pagination detection on listing pages
//! - Product page classification for site traversal
//! - Field extraction through ordered selector cascades
//! - Price parsing and image collection

pub mod cascade;
pub mod classify;
pub mod images;
pub mod links;
pub mod price;
pub mod product;
pub mod text;

pub use cascade::{Cascade, Locate, Read, Strategy};
pub use classify::PageClassifier;
pub use images::{collect_images, collect_lazy_images, upgrade_resolution, HIGH_RES_SEGMENT};
pub use links::{extract_product_links, find_max_listing_page};
pub use price::parse_price;
pub use product::{ExtractionProfile, ProductExtractor};
