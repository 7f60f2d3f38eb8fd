//! Derived documents rebuilt from the JSON-lines store
//!
//! Both operations are pure transforms of the JSON-lines store and can be
//! re-run at any time. They must not run while a crawl is writing the same
//! files.

use crate::config::OutputPaths;
use crate::model::Product;
use crate::storage::jsonl::{read_records, rewrite_records};
use crate::storage::table::rewrite_table;
use crate::storage::traits::StorageResult;
use indexmap::IndexSet;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

/// Summary of a regeneration pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RegenReport {
    /// Records written to every store
    pub records: usize,
    /// Later duplicates of an already seen URL that were dropped
    pub duplicates_dropped: usize,
}

/// Writes the aggregate array-of-records document
///
/// # Returns
///
/// The number of records written.
pub fn materialize_catalog(records_path: &Path, catalog_path: &Path) -> StorageResult<usize> {
    let records = read_records(records_path)?;
    write_catalog(catalog_path, &records)?;
    tracing::info!(
        "Wrote {} record(s) to {}",
        records.len(),
        catalog_path.display()
    );
    Ok(records.len())
}

/// Rebuilds every store from the JSON-lines store
///
/// Unreadable lines are dropped and only the first record per URL is kept.
/// The JSON-lines store itself is rewritten in that cleaned form, then the
/// CSV store and the aggregate document are regenerated from it.
pub fn regenerate_catalog(paths: &OutputPaths, image_columns: usize) -> StorageResult<RegenReport> {
    let all = read_records(&paths.records)?;
    let total = all.len();
    let records = first_per_url(all);

    rewrite_records(&paths.records, &records)?;
    rewrite_table(&paths.table, &records, image_columns)?;
    write_catalog(&paths.catalog, &records)?;

    let report = RegenReport {
        records: records.len(),
        duplicates_dropped: total - records.len(),
    };
    tracing::info!(
        "Regenerated {} record(s), dropped {} duplicate(s)",
        report.records,
        report.duplicates_dropped
    );
    Ok(report)
}

fn first_per_url(records: Vec<Product>) -> Vec<Product> {
    let mut seen: IndexSet<String> = IndexSet::new();
    records
        .into_iter()
        .filter(|product| seen.insert(product.url.clone()))
        .collect()
}

fn write_catalog(path: &Path, records: &[Product]) -> StorageResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let tmp = path.with_extension("json.tmp");
    {
        let mut writer = BufWriter::new(File::create(&tmp)?);
        serde_json::to_writer_pretty(&mut writer, records)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        writer.get_ref().sync_all()?;
    }
    fs::rename(&tmp, path)?;
    Ok(())
}
