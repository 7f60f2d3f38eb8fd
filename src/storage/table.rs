//! Tabular CSV record store
//!
//! Fixed columns mirroring [`Product`]. Images are flattened into a bounded
//! number of indexed columns plus one pipe-joined column holding all of them.

use crate::model::Product;
use crate::storage::traits::{repair_torn_tail, RecordStore, StorageError, StorageResult};
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

/// Separator used in the `all_images` column
pub const IMAGE_SEPARATOR: &str = "|";

/// Columns before the indexed image columns
const LEADING_COLUMNS: &[&str] = &[
    "name",
    "sku",
    "upc",
    "mpn",
    "brand",
    "manufacturer",
    "price",
    "price_numeric",
    "in_stock",
    "category",
    "description_short",
    "description_full",
    "url",
];

/// Header row for the given number of image columns
pub fn header(image_columns: usize) -> Vec<String> {
    let mut columns: Vec<String> = LEADING_COLUMNS.iter().map(|c| c.to_string()).collect();
    columns.extend((1..=image_columns).map(|i| format!("image_{}", i)));
    columns.push("all_images".to_string());
    columns.push("specifications_json".to_string());
    columns
}

/// One CSV row for a product, aligned with [`header`]
pub fn row(product: &Product, image_columns: usize) -> StorageResult<Vec<String>> {
    let mut cells = vec![
        product.name.clone(),
        product.sku.clone(),
        product.upc.clone(),
        product.mpn.clone(),
        product.brand.clone(),
        product.manufacturer.clone(),
        product.price_display.clone(),
        product
            .price_numeric
            .map(|p| p.to_string())
            .unwrap_or_default(),
        product.in_stock.to_string(),
        product.category.clone(),
        product.description_short.clone(),
        product.description_full.clone(),
        product.url.clone(),
    ];

    cells.extend(
        (0..image_columns).map(|i| product.images.get(i).cloned().unwrap_or_default()),
    );
    cells.push(product.images.join(IMAGE_SEPARATOR));
    cells.push(if product.specifications.is_empty() {
        String::new()
    } else {
        serde_json::to_string(&product.specifications)?
    });

    Ok(cells)
}

/// Appending CSV file
///
/// The header is written only when the file is new or empty, so successive
/// runs extend one table.
pub struct CsvTableStore {
    path: PathBuf,
    writer: csv::Writer<File>,
    image_columns: usize,
}

impl CsvTableStore {
    pub fn open(path: &Path, image_columns: usize, truncate: bool) -> StorageResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(path)?;

        if truncate {
            file.set_len(0)?;
        } else {
            repair_torn_tail(&mut file)?;
        }

        let needs_header = file.metadata()?.len() == 0;
        if !needs_header {
            let expected = header(image_columns);
            let found = existing_header(path)?;
            if found != expected {
                return Err(StorageError::HeaderMismatch {
                    path: path.display().to_string(),
                    expected: expected.len(),
                    found: found.len(),
                });
            }
        }

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);

        if needs_header {
            writer.write_record(header(image_columns))?;
            writer.flush()?;
        }

        Ok(Self {
            path: path.to_path_buf(),
            writer,
            image_columns,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RecordStore for CsvTableStore {
    fn name(&self) -> &'static str {
        "csv"
    }

    fn append(&mut self, product: &Product) -> StorageResult<()> {
        self.writer.write_record(row(product, self.image_columns)?)?;
        self.writer.flush()?;
        self.writer.get_ref().sync_data()?;
        Ok(())
    }
}

/// First row of an existing table
fn existing_header(path: &Path) -> StorageResult<Vec<String>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)?;
    let first = reader.records().next().transpose()?;
    Ok(first
        .map(|record| record.iter().map(str::to_string).collect())
        .unwrap_or_default())
}

/// Rewrites the CSV file from scratch with the given records
pub fn rewrite_table(path: &Path, records: &[Product], image_columns: usize) -> StorageResult<()> {
    let mut store = CsvTableStore::open(path, image_columns, true)?;
    for product in records {
        store.append(product)?;
    }
    Ok(())
}
