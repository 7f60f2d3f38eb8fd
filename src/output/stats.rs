//! Run and catalog statistics
//!
//! This module provides the counters kept during a crawl and the summary
//! computed from a finished catalog, plus their console rendering.

use crate::config::DiscoveryMode;
use crate::model::Product;
use indexmap::IndexMap;
use std::time::Duration;

/// Counters for a single crawl run
#[derive(Debug, Clone, Default)]
pub struct RunStatistics {
    pub mode: DiscoveryMode,

    /// Listing pages fetched (listing mode)
    pub listing_pages: u32,

    /// Pages fetched during traversal (site mode)
    pub pages_visited: usize,

    /// Candidate product URLs found
    pub discovered: usize,

    /// Candidates skipped because the checkpoint already had them
    pub already_completed: usize,

    pub succeeded: usize,
    pub failed: usize,

    /// Successes that could not be written to the primary store
    pub not_persisted: usize,

    /// Write failures of any store or the checkpoint
    pub persistence_errors: usize,

    pub with_images: usize,

    /// Products showing any price text, parseable or not
    pub with_price: usize,
    pub in_stock: usize,
    pub total_images: usize,

    /// Image files saved when image download is enabled
    pub images_downloaded: usize,

    pub elapsed: Duration,
}

impl RunStatistics {
    pub fn new(mode: DiscoveryMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    /// Counts the content of a stored product
    pub fn record_product(&mut self, product: &Product) {
        self.succeeded += 1;
        if !product.images.is_empty() {
            self.with_images += 1;
        }
        if !product.price_display.is_empty() {
            self.with_price += 1;
        }
        if product.in_stock {
            self.in_stock += 1;
        }
        self.total_images += product.images.len();
    }

    /// Items actually attempted this run
    pub fn attempted(&self) -> usize {
        self.succeeded + self.failed + self.not_persisted
    }

    pub fn average_images(&self) -> f64 {
        if self.succeeded == 0 {
            0.0
        } else {
            self.total_images as f64 / self.succeeded as f64
        }
    }
}

/// Summary of everything in the record store
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogStatistics {
    pub total: usize,
    pub with_name: usize,
    pub with_sku: usize,

    /// Products showing any price text; the range covers parseable ones only
    pub with_price: usize,
    pub with_images: usize,
    pub with_specifications: usize,
    pub in_stock: usize,
    pub total_images: usize,

    /// Products per category, most common first
    pub categories: IndexMap<String, usize>,

    /// Products per brand, most common first
    pub brands: IndexMap<String, usize>,

    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
}

impl CatalogStatistics {
    pub fn from_records(records: &[Product]) -> Self {
        let mut stats = Self {
            total: records.len(),
            ..Self::default()
        };

        for product in records {
            stats.with_name += usize::from(!product.name.is_empty());
            stats.with_sku += usize::from(!product.sku.is_empty());
            stats.with_images += usize::from(!product.images.is_empty());
            stats.with_specifications += usize::from(!product.specifications.is_empty());
            stats.in_stock += usize::from(product.in_stock);
            stats.total_images += product.images.len();

            stats.with_price += usize::from(!product.price_display.is_empty());
            if let Some(price) = product.price_numeric {
                stats.min_price = Some(stats.min_price.map_or(price, |m| m.min(price)));
                stats.max_price = Some(stats.max_price.map_or(price, |m| m.max(price)));
            }

            if !product.category.is_empty() {
                *stats.categories.entry(product.category.clone()).or_default() += 1;
            }
            if !product.brand.is_empty() {
                *stats.brands.entry(product.brand.clone()).or_default() += 1;
            }
        }

        stats.categories.sort_by(|ka, a, kb, b| b.cmp(a).then_with(|| ka.cmp(kb)));
        stats.brands.sort_by(|ka, a, kb, b| b.cmp(a).then_with(|| ka.cmp(kb)));
        stats
    }

    pub fn average_images(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.total_images as f64 / self.total as f64
        }
    }
}

fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        (part as f64 / whole as f64) * 100.0
    }
}

/// Prints the end-of-run report to stdout
pub fn print_run_statistics(stats: &RunStatistics) {
    println!("=== Crawl Statistics ===\n");

    println!("Discovery ({}):", stats.mode.as_str());
    match stats.mode {
        DiscoveryMode::Listing => println!("  Listing pages fetched: {}", stats.listing_pages),
        DiscoveryMode::Site => println!("  Pages visited: {}", stats.pages_visited),
    }
    println!("  Product URLs found: {}", stats.discovered);
    println!("  Skipped (already complete): {}", stats.already_completed);
    println!();

    println!("Products:");
    println!("  Succeeded: {}", stats.succeeded);
    println!("  Failed: {}", stats.failed);
    if stats.not_persisted > 0 || stats.persistence_errors > 0 {
        println!("  Not persisted: {}", stats.not_persisted);
        println!("  Write errors: {}", stats.persistence_errors);
    }
    println!(
        "  With images: {} ({:.1}%)",
        stats.with_images,
        percentage(stats.with_images, stats.succeeded)
    );
    println!(
        "  With price: {} ({:.1}%)",
        stats.with_price,
        percentage(stats.with_price, stats.succeeded)
    );
    println!("  In stock: {}", stats.in_stock);
    println!("  Average images per product: {:.1}", stats.average_images());
    if stats.images_downloaded > 0 {
        println!("  Images downloaded: {}", stats.images_downloaded);
    }
    println!();

    println!(
        "Success Rate: {:.1}% ({} / {} attempted)",
        percentage(stats.succeeded, stats.attempted()),
        stats.succeeded,
        stats.attempted()
    );
    println!("Elapsed: {:.1}s", stats.elapsed.as_secs_f64());
}

/// Prints catalog statistics to stdout
pub fn print_catalog_statistics(stats: &CatalogStatistics) {
    println!("=== Catalog Statistics ===\n");

    println!("Records: {}", stats.total);
    println!(
        "  With name: {} ({:.1}%)",
        stats.with_name,
        percentage(stats.with_name, stats.total)
    );
    println!(
        "  With SKU: {} ({:.1}%)",
        stats.with_sku,
        percentage(stats.with_sku, stats.total)
    );
    println!(
        "  With price: {} ({:.1}%)",
        stats.with_price,
        percentage(stats.with_price, stats.total)
    );
    println!(
        "  With images: {} ({:.1}%)",
        stats.with_images,
        percentage(stats.with_images, stats.total)
    );
    println!("  With specifications: {}", stats.with_specifications);
    println!("  In stock: {}", stats.in_stock);
    println!("  Average images per product: {:.1}", stats.average_images());

    if let (Some(min), Some(max)) = (stats.min_price, stats.max_price) {
        println!("  Price range: {:.2} - {:.2}", min, max);
    }
    println!();

    if !stats.categories.is_empty() {
        println!("Top Categories:");
        for (category, count) in stats.categories.iter().take(10) {
            println!("  {}: {}", category, count);
        }
        println!();
    }

    if !stats.brands.is_empty() {
        println!("Top Brands:");
        for (brand, count) in stats.brands.iter().take(10) {
            println!("  {}: {}", brand, count);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(category: &str, price: Option<f64>, images: usize) -> Product {
        let mut product = Product::new("https://e.com/x/");
        product.name = "Widget".to_string();
        product.category = category.to_string();
        product.price_numeric = price;
        product.price_display = price.map(|p| format!("${:.2}", p)).unwrap_or_default();
        product.images = (0..images).map(|i| format!("https://cdn/{}.jpg", i)).collect();
        product
    }

    #[test]
    fn test_run_statistics_counts() {
        let mut stats = RunStatistics::new(DiscoveryMode::Listing);
        stats.record_product(&product("Tools", Some(10.0), 2));
        stats.record_product(&product("Tools", None, 0));
        stats.failed = 1;

        assert_eq!(stats.succeeded, 2);
        assert_eq!(stats.with_images, 1);
        assert_eq!(stats.with_price, 1);
        assert_eq!(stats.attempted(), 3);
        assert_eq!(stats.average_images(), 1.0);
    }

    #[test]
    fn test_catalog_statistics() {
        let records = vec![
            product("Boxes", Some(25.0), 1),
            product("Tapers", Some(5.5), 3),
            product("Tapers", None, 0),
            product("", Some(100.0), 2),
        ];
        let stats = CatalogStatistics::from_records(&records);

        assert_eq!(stats.total, 4);
        assert_eq!(stats.with_price, 3);
        assert_eq!(stats.with_images, 3);
        assert_eq!(stats.min_price, Some(5.5));
        assert_eq!(stats.max_price, Some(100.0));
        assert_eq!(stats.average_images(), 1.5);
        assert_eq!(
            stats.categories.iter().collect::<Vec<_>>(),
            vec![(&"Tapers".to_string(), &2), (&"Boxes".to_string(), &1)]
        );
    }

    #[test]
    fn test_unparseable_price_text_still_counts() {
        let mut quoted = product("Tools", None, 0);
        quoted.price_display = "Call for price".to_string();

        let mut run = RunStatistics::new(DiscoveryMode::Site);
        run.record_product(&quoted);
        assert_eq!(run.with_price, 1);

        let catalog = CatalogStatistics::from_records(&[quoted]);
        assert_eq!(catalog.with_price, 1);
        assert!(catalog.min_price.is_none());
    }

    #[test]
    fn test_empty_catalog() {
        let stats = CatalogStatistics::from_records(&[]);
        assert_eq!(stats.total, 0);
        assert_eq!(stats.average_images(), 0.0);
        assert!(stats.min_price.is_none());
    }
}
