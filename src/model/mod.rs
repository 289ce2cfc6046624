//! Core data models for the audiobook pipeline.
//!
//! Defines the primary entities: [`BookRecord`] (the reconciled catalog
//! metadata for one audiobook) and [`LocalFileInfo`] (what was read from the
//! file on disk). A record is owned by the pipeline invocation that created
//! it until it is committed to the processed log.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Metadata for a single audiobook, local fields merged with catalog fields.
///
/// `metadata.json` sidecars are the serialized form of this struct, so the
/// field names here are a stable on-disk format.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BookRecord {
    /// Audible catalog identifier. Uniquely identifies a catalog entry
    /// when present.
    pub asin: Option<String>,
    /// Book title. Non-empty once the record is finalized.
    pub title: String,
    pub subtitle: Option<String>,
    /// Authors in credit order.
    pub authors: Vec<String>,
    /// Narrators in credit order.
    pub narrators: Vec<String>,
    /// Series title, if the book belongs to one.
    pub series: Option<String>,
    /// Position within the series, zero-padded when numeric ("01", "12").
    pub series_part: Option<String>,
    pub description: Option<String>,
    /// Full release date as reported by the catalog (YYYY-MM-DD).
    pub release_date: Option<String>,
    /// Release year derived from `release_date`.
    pub year: Option<i32>,
    /// Average catalog rating.
    pub rating: Option<f64>,
    pub cover_url: Option<String>,
    /// Public product page URL.
    pub product_url: Option<String>,
    pub publisher: Option<String>,
    pub language: Option<String>,
    /// Total runtime in seconds.
    pub runtime_secs: Option<u64>,
}

impl BookRecord {
    /// First credited author, or `None` for an author-less record.
    pub fn primary_author(&self) -> Option<&str> {
        self.authors.first().map(String::as_str)
    }

    /// True once the record satisfies the finalization invariant.
    pub fn has_title(&self) -> bool {
        !self.title.trim().is_empty()
    }
}

/// Join a contributor list for display or tagging ("A & B").
pub fn format_contributors(names: &[String], separator: &str) -> String {
    names.join(separator)
}

/// Cover art embedded in an audio file's tags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedCover {
    /// Image data (JPEG or PNG)
    pub data: Vec<u8>,
    /// MIME type (image/jpeg or image/png)
    pub mime_type: String,
}

/// Metadata extracted from a local audio file.
///
/// All fields except `path` are optional: a file with no embedded tags
/// yields a record with empty fields, not an error.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocalFileInfo {
    pub path: PathBuf,
    pub title: Option<String>,
    pub author: Option<String>,
    pub asin: Option<String>,
    pub cover: Option<EmbeddedCover>,
}
