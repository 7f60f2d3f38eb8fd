//! Resumable sink
//!
//! Streams each outcome to disk as soon as it is known:
//! - successes go to the JSON-lines store, then the CSV store, then the
//!   checkpoint
//! - failures are logged only; they stay out of the checkpoint so the next
//!   run retries them
//!
//! The JSON-lines store is authoritative. If appending to it fails the URL is
//! not checkpointed. A failed CSV append is logged and counted but does not
//! hold back the checkpoint, since the table can be rebuilt from the
//! JSON-lines store.

use crate::config::OutputPaths;
use crate::model::Outcome;
use crate::storage::checkpoint::CrawlCheckpoint;
use crate::storage::jsonl::{read_records, JsonLinesStore};
use crate::storage::table::CsvTableStore;
use crate::storage::traits::{RecordStore, StorageResult};
use std::fs;
use std::path::{Path, PathBuf};

/// What happened to one recorded outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordStatus {
    /// Record stored and URL checkpointed
    Stored,
    /// URL was already checkpointed; nothing written
    AlreadyCompleted,
    /// Extraction failed; nothing written
    Failed,
    /// The primary store rejected the record; URL not checkpointed
    NotPersisted,
}

/// Owner of the output stores and the checkpoint for one run
pub struct ResumableSink {
    checkpoint_path: PathBuf,
    records: Box<dyn RecordStore>,
    table: Box<dyn RecordStore>,
    checkpoint: CrawlCheckpoint,
    persistence_errors: usize,
}

impl ResumableSink {
    /// Opens the stores and loads (or resets) the checkpoint
    ///
    /// # Arguments
    ///
    /// * `paths` - Output file locations
    /// * `image_columns` - Number of dedicated image columns in the CSV store
    /// * `fresh` - Discard previous progress and truncate the stores
    /// * `fingerprint` - Identity of this run's mode and start URL
    ///
    /// Unless `fresh` is set, every URL found in the JSON-lines store is
    /// merged into the checkpoint before returning. This closes the window
    /// between a record append and the checkpoint write.
    pub fn open(
        paths: &OutputPaths,
        image_columns: usize,
        fresh: bool,
        fingerprint: &str,
    ) -> StorageResult<Self> {
        if fresh {
            remove_if_exists(&paths.checkpoint)?;
            remove_if_exists(&paths.catalog)?;
            tracing::info!("Fresh start: previous progress discarded");
        }

        let records = JsonLinesStore::open(&paths.records, fresh)?;
        let table = CsvTableStore::open(&paths.table, image_columns, fresh)?;

        let checkpoint = match CrawlCheckpoint::load(&paths.checkpoint) {
            Some(existing) => {
                if existing.run_fingerprint.as_deref() != Some(fingerprint) {
                    tracing::warn!(
                        "Checkpoint was written by a run with a different mode or start URL; \
                         its {} completed URL(s) will still be skipped",
                        existing.len()
                    );
                }
                existing
            }
            None => CrawlCheckpoint::new(Some(fingerprint.to_string())),
        };

        let mut sink = Self::with_stores(
            &paths.checkpoint,
            Box::new(records),
            Box::new(table),
            checkpoint,
        );

        if !fresh {
            sink.reconcile(&paths.records)?;
        }

        Ok(sink)
    }

    /// Builds a sink from already opened stores
    pub fn with_stores(
        checkpoint_path: &Path,
        records: Box<dyn RecordStore>,
        table: Box<dyn RecordStore>,
        checkpoint: CrawlCheckpoint,
    ) -> Self {
        Self {
            checkpoint_path: checkpoint_path.to_path_buf(),
            records,
            table,
            checkpoint,
            persistence_errors: 0,
        }
    }

    /// Merges URLs present in the JSON-lines store into the checkpoint
    fn reconcile(&mut self, records_path: &Path) -> StorageResult<()> {
        let recovered = read_records(records_path)?
            .into_iter()
            .filter(|product| self.checkpoint.mark_completed(product.url.clone()))
            .count();

        if recovered > 0 {
            tracing::info!(
                "Recovered {} stored record(s) missing from the checkpoint",
                recovered
            );
            self.checkpoint.save(&self.checkpoint_path)?;
        }

        Ok(())
    }

    pub fn is_completed(&self, url: &str) -> bool {
        self.checkpoint.is_completed(url)
    }

    pub fn completed_count(&self) -> usize {
        self.checkpoint.len()
    }

    pub fn checkpoint(&self) -> &CrawlCheckpoint {
        &self.checkpoint
    }

    /// Count of write failures seen so far (any store or the checkpoint)
    pub fn persistence_errors(&self) -> usize {
        self.persistence_errors
    }

    /// Records the outcome for one URL
    ///
    /// Never fails: write errors are logged and counted so the run can move
    /// on to the next item.
    pub fn record_outcome(&mut self, url: &str, outcome: &Outcome) -> RecordStatus {
        let product = match outcome {
            Ok(product) => product,
            Err(failure) => {
                tracing::warn!("✗ {}: {}", url, failure);
                return RecordStatus::Failed;
            }
        };

        if self.checkpoint.is_completed(url) {
            tracing::debug!("Already completed, not storing again: {}", url);
            return RecordStatus::AlreadyCompleted;
        }

        if let Err(e) = self.records.append(product) {
            self.persistence_errors += 1;
            tracing::error!(
                "Could not store {} in {} store: {}; it will be retried next run",
                url,
                self.records.name(),
                e
            );
            return RecordStatus::NotPersisted;
        }

        if let Err(e) = self.table.append(product) {
            self.persistence_errors += 1;
            tracing::warn!(
                "Could not append {} to {} store: {} (rebuild with --regen)",
                url,
                self.table.name(),
                e
            );
        }

        self.checkpoint.mark_completed(url);
        if let Err(e) = self.checkpoint.save(&self.checkpoint_path) {
            self.persistence_errors += 1;
            tracing::warn!(
                "Could not write checkpoint after {}: {} (recovered on next start)",
                url,
                e
            );
        }

        tracing::info!("✓ {} ({})", product.name, url);
        RecordStatus::Stored
    }
}

fn remove_if_exists(path: &Path) -> StorageResult<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}
