//! Output module for run reports
//!
//! This module handles:
//! - Counting outcomes during a crawl
//! - Summarizing a finished catalog
//! - Printing both to the console

pub mod stats;

pub use stats::{print_catalog_statistics, print_run_statistics, CatalogStatistics, RunStatistics};

use crate::storage::{read_records, StorageResult};
use std::path::Path;

/// Computes catalog statistics from a JSON-lines record store
///
/// # Arguments
///
/// * `records_path` - Path of the `.jsonl` store
///
/// # Returns
///
/// * `Ok(CatalogStatistics)` - Statistics over every readable record
/// * `Err(StorageError)` - The store could not be read
pub fn load_catalog_statistics(records_path: &Path) -> StorageResult<CatalogStatistics> {
    let records = read_records(records_path)?;
    Ok(CatalogStatistics::from_records(&records))
}
