//! JSON-lines record store
//!
//! The primary store: one serialized [`Product`] per line, append-only,
//! UTF-8. Each line parses on its own, so a torn final line never hides the
//! records before it.

use crate::model::Product;
use crate::storage::traits::{repair_torn_tail, RecordStore, StorageResult};
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

/// Append-only JSON-lines file
pub struct JsonLinesStore {
    path: PathBuf,
    file: File,
}

impl JsonLinesStore {
    /// Opens the store for appending, creating it if needed
    ///
    /// # Arguments
    ///
    /// * `path` - Location of the `.jsonl` file
    /// * `truncate` - Discard existing content first
    pub fn open(path: &Path, truncate: bool) -> StorageResult<Self> {
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
        } else if repair_torn_tail(&mut file)? {
            tracing::warn!(
                "{} ended with a partial line; it will be skipped on read",
                path.display()
            );
        }

        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RecordStore for JsonLinesStore {
    fn name(&self) -> &'static str {
        "jsonl"
    }

    /// Appends one line, never leaving a fragment behind
    ///
    /// Any partial line at the end of the file is terminated first. A write
    /// that fails part-way is rolled back to the previous length; if even that
    /// fails, the next append terminates the fragment.
    fn append(&mut self, product: &Product) -> StorageResult<()> {
        let mut line = serde_json::to_string(product)?;
        line.push('\n');

        if repair_torn_tail(&mut self.file)? {
            tracing::warn!(
                "{} ended with a partial line; terminated it before appending",
                self.path.display()
            );
        }

        let committed = self.file.metadata()?.len();
        let written = self
            .file
            .write_all(line.as_bytes())
            .and_then(|_| self.file.flush())
            .and_then(|_| self.file.sync_data());

        if let Err(e) = written {
            if let Err(rollback) = self.file.set_len(committed) {
                tracing::warn!(
                    "Could not roll back partial write to {}: {}",
                    self.path.display(),
                    rollback
                );
            }
            return Err(e.into());
        }
        Ok(())
    }
}

/// Reads every parseable record from a JSON-lines file
///
/// A missing file reads as empty. Blank and unparseable lines are skipped
/// with a warning.
pub fn read_records(path: &Path) -> StorageResult<Vec<Product>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let reader = BufReader::new(File::open(path)?);
    let mut records = Vec::new();

    for (index, line) in reader.split(b'\n').enumerate() {
        let bytes = line?;
        let text = String::from_utf8_lossy(&bytes);
        let text = text.trim();
        if text.is_empty() {
            continue;
        }

        match serde_json::from_str::<Product>(text) {
            Ok(product) => records.push(product),
            Err(e) => tracing::warn!(
                "Skipping unreadable line {} of {}: {}",
                index + 1,
                path.display(),
                e
            ),
        }
    }

    Ok(records)
}

/// Rewrites a JSON-lines file from scratch with the given records
///
/// Writes a temporary sibling and renames it over the original.
pub fn rewrite_records(path: &Path, records: &[Product]) -> StorageResult<()> {
    let tmp = path.with_extension("jsonl.tmp");
    {
        let mut file = File::create(&tmp)?;
        for product in records {
            serde_json::to_writer(&mut file, product)?;
            file.write_all(b"\n")?;
        }
        file.flush()?;
        file.sync_all()?;
    }
    fs::rename(&tmp, path)?;
    Ok(())
}
