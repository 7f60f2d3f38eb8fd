//! Crawl checkpoint
//!
//! The checkpoint is the set of URLs whose records are durably stored. It is
//! rewritten after every success through a temporary file and a rename, so a
//! reader sees either the previous or the new version, never a mix. A file
//! that fails to parse anyway is treated as no checkpoint at all.

use crate::storage::traits::StorageResult;
use chrono::{DateTime, Utc};
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

/// Persistent record of completed work
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrawlCheckpoint {
    /// URLs with a durably stored record, in completion order
    pub completed_urls: IndexSet<String>,

    /// Identifies the mode and start URL of the run that wrote the file
    #[serde(default)]
    pub run_fingerprint: Option<String>,

    #[serde(default = "Utc::now")]
    pub started_at: DateTime<Utc>,

    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl CrawlCheckpoint {
    pub fn new(run_fingerprint: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            completed_urls: IndexSet::new(),
            run_fingerprint,
            started_at: now,
            updated_at: now,
        }
    }

    /// Loads a checkpoint, tolerating absence and corruption
    ///
    /// # Returns
    ///
    /// * `Some(checkpoint)` - The file exists and parses
    /// * `None` - No usable checkpoint; start from nothing
    pub fn load(path: &Path) -> Option<Self> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!("Could not read checkpoint {}: {}", path.display(), e);
                return None;
            }
        };

        match serde_json::from_str(&content) {
            Ok(checkpoint) => Some(checkpoint),
            Err(e) => {
                tracing::warn!(
                    "Checkpoint {} is corrupt ({}); starting without it",
                    path.display(),
                    e
                );
                None
            }
        }
    }

    /// Writes the checkpoint atomically
    pub fn save(&mut self, path: &Path) -> StorageResult<()> {
        self.updated_at = Utc::now();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let tmp = path.with_extension("json.tmp");
        {
            let mut file = File::create(&tmp)?;
            serde_json::to_writer_pretty(&mut file, self)?;
            file.write_all(b"\n")?;
            file.flush()?;
            file.sync_all()?;
        }
        fs::rename(&tmp, path)?;
        Ok(())
    }

    pub fn is_completed(&self, url: &str) -> bool {
        self.completed_urls.contains(url)
    }

    /// Marks a URL completed; returns false if it already was
    pub fn mark_completed(&mut self, url: impl Into<String>) -> bool {
        self.completed_urls.insert(url.into())
    }

    pub fn len(&self) -> usize {
        self.completed_urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.completed_urls.is_empty()
    }
}
