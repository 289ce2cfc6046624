//! Processed-file log: the append-only skip-list that makes reruns
//! idempotent.
//!
//! The log is a JSON object mapping source paths to a small summary of what
//! was committed (destination, title, ASIN, timestamp). It is loaded at
//! scan time to filter already-handled files and rewritten after each
//! successful commit. Between writes the file is kept read-only so other
//! tooling doesn't clobber it.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Result, ResultExt};
use crate::model::BookRecord;

/// Default log filename, stored in the output directory.
pub const PROCESSED_LOG_NAME: &str = "processed_metadata.json";

/// One committed file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessedEntry {
    /// Where the audio ended up
    pub destination: PathBuf,
    pub title: Option<String>,
    pub asin: Option<String>,
    /// RFC 3339 commit time
    pub timestamp: String,
}

impl ProcessedEntry {
    /// Entry for a record committed to `destination` now.
    pub fn new(destination: impl Into<PathBuf>, record: &BookRecord) -> Self {
        Self {
            destination: destination.into(),
            title: record.has_title().then(|| record.title.clone()),
            asin: record.asin.clone(),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

/// The on-disk skip-log.
#[derive(Debug)]
pub struct ProcessedLog {
    path: PathBuf,
    entries: BTreeMap<String, ProcessedEntry>,
}

impl ProcessedLog {
    /// Load the log, tolerating a missing or corrupt file (starts fresh
    /// with a warning - losing the log only costs reprocessing).
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();

        let entries = match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<BTreeMap<String, ProcessedEntry>>(
                &contents,
            ) {
                Ok(entries) => {
                    tracing::info!("Loaded {} paths from processed log", entries.len());
                    entries
                }
                Err(e) => {
                    tracing::warn!("Could not parse {}: {e}. Starting fresh.", path.display());
                    BTreeMap::new()
                }
            },
            Err(_) => {
                tracing::info!("No processed log at {}, starting fresh", path.display());
                BTreeMap::new()
            }
        };

        Self { path, entries }
    }

    /// Resolve the log location for an output directory, honoring the
    /// configured override.
    pub fn location(output_dir: &Path, configured: Option<&Path>) -> PathBuf {
        match configured {
            Some(path) => path.to_path_buf(),
            None => output_dir.join(PROCESSED_LOG_NAME),
        }
    }

    /// Has this source path already been committed?
    pub fn contains(&self, source: &Path) -> bool {
        self.entries.contains_key(&source.to_string_lossy().to_string())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Record a committed file and persist the log.
    pub fn record(&mut self, source: &Path, entry: ProcessedEntry) -> Result<()> {
        self.entries
            .insert(source.to_string_lossy().to_string(), entry);
        self.save()
    }

    fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(format!("creating {}", parent.display()))?;
        }

        // The file is left read-only between writes
        if self.path.exists() {
            set_readonly(&self.path, false)?;
        }

        let json = serde_json::to_string_pretty(&self.entries)
            .expect("a string-keyed map always serializes");
        fs::write(&self.path, json)
            .with_context(format!("writing {}", self.path.display()))?;

        set_readonly(&self.path, true)?;
        tracing::debug!("Saved processed log ({} entries)", self.entries.len());
        Ok(())
    }
}

fn set_readonly(path: &Path, readonly: bool) -> Result<()> {
    let metadata = fs::metadata(path)
        .with_context(format!("reading permissions of {}", path.display()))?;
    let mut permissions = metadata.permissions();
    permissions.set_readonly(readonly);
    fs::set_permissions(path, permissions)
        .with_context(format!("setting permissions of {}", path.display()))?;
    Ok(())
}
