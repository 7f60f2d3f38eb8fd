//! Storage traits and error types
//!
//! This module defines the trait interface for record stores and the
//! associated error types.

use crate::model::Product;
use std::io::{Read, Seek, SeekFrom, Write};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("{path} has a different column layout ({found} columns, expected {expected}); run --regen or --fresh")]
    HeaderMismatch {
        path: String,
        expected: usize,
        found: usize,
    },
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// An append-only, durable store of product records
///
/// Implementations must have forced the record to stable storage by the time
/// `append` returns: a crash right after the call must not lose it.
pub trait RecordStore: Send {
    /// Short name used in log messages
    fn name(&self) -> &'static str;

    /// Appends one record and syncs it to disk
    fn append(&mut self, product: &Product) -> StorageResult<()>;
}

/// Appends a newline if a non-empty file does not already end with one
///
/// A crash in the middle of an append leaves a torn last line. Terminating it
/// keeps the next record on a line of its own, so only the torn line is lost.
///
/// Returns true if a repair was made.
pub fn repair_torn_tail<F>(file: &mut F) -> StorageResult<bool>
where
    F: Read + Write + Seek,
{
    let len = file.seek(SeekFrom::End(0))?;
    if len == 0 {
        return Ok(false);
    }

    file.seek(SeekFrom::End(-1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    file.seek(SeekFrom::End(0))?;

    if last[0] == b'\n' {
        return Ok(false);
    }

    file.write_all(b"\n")?;
    file.flush()?;
    Ok(true)
}
