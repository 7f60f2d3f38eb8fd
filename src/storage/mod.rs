//! Storage module for persisting crawl results
//!
//! This module handles every file a run writes, including:
//! - The append-only JSON-lines record store (primary)
//! - The appending CSV table
//! - The atomically rewritten checkpoint of completed URLs
//! - The resumable sink tying them together
//! - The aggregate JSON document and full regeneration

mod aggregate;
mod checkpoint;
mod jsonl;
mod sink;
mod table;
mod traits;

pub use aggregate::{materialize_catalog, regenerate_catalog, RegenReport};
pub use checkpoint::CrawlCheckpoint;
pub use jsonl::{read_records, rewrite_records, JsonLinesStore};
pub use sink::{RecordStatus, ResumableSink};
pub use table::{header as table_header, row as table_row, rewrite_table, CsvTableStore, IMAGE_SEPARATOR};
pub use traits::{repair_torn_tail, RecordStore, StorageError, StorageResult};
