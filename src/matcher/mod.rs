//! Reconciliation of embedded tags with catalog metadata.
//!
//! The merge is deliberately mechanical: one side takes precedence (the
//! catalog by default, configurable), the other fills gaps. Disagreements
//! are reported as a field diff for the user to review; nothing is resolved
//! heuristically. Manual overrides and the final non-empty-title check
//! happen here too.

use crate::error::{Error, Result};
use crate::model::{BookRecord, LocalFileInfo};

/// A field where the embedded tags and the catalog disagree.
///
/// `resolved_value` is what the merge chose under the active precedence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDiff {
    pub field: String,
    pub local_value: String,
    pub remote_value: String,
    pub resolved_value: String,
}

/// Result of merging local tags with a catalog record.
#[derive(Debug, Clone)]
pub struct MergeOutcome {
    pub record: BookRecord,
    /// Fields where both sides had a value and they differed
    pub diff: Vec<FieldDiff>,
}

/// Merge embedded tags with an optional catalog record.
///
/// With `prefer_remote` (the default), catalog fields win wherever both
/// sides have a value and local tags only fill gaps; with it off the roles
/// reverse. Only title, author, and ASIN exist on the local side; every
/// other field comes from the catalog record untouched.
pub fn merge(
    local: &LocalFileInfo,
    remote: Option<&BookRecord>,
    prefer_remote: bool,
) -> MergeOutcome {
    let mut record = remote.cloned().unwrap_or_default();
    let mut diff = Vec::new();

    // Title
    let remote_title = record.title.trim().to_string();
    let local_title = local.title.as_deref().unwrap_or("").trim().to_string();
    record.title = resolve(
        "title",
        &local_title,
        &remote_title,
        prefer_remote,
        &mut diff,
    );

    // Author: the local side is a single string, the remote an ordered list
    let remote_author = record.authors.first().cloned().unwrap_or_default();
    let local_author = local.author.as_deref().unwrap_or("").trim().to_string();
    let resolved_author = resolve(
        "author",
        &local_author,
        &remote_author,
        prefer_remote,
        &mut diff,
    );
    if record.authors.is_empty() && !resolved_author.is_empty() {
        record.authors = vec![resolved_author];
    } else if !prefer_remote && !local_author.is_empty() && resolved_author == local_author {
        // Local wins the primary credit; co-authors from the catalog remain
        if let Some(first) = record.authors.first_mut() {
            *first = resolved_author;
        }
    }

    // ASIN
    let remote_asin = record.asin.clone().unwrap_or_default();
    let local_asin = local.asin.as_deref().unwrap_or("").trim().to_string();
    let resolved_asin = resolve("asin", &local_asin, &remote_asin, prefer_remote, &mut diff);
    record.asin = Some(resolved_asin).filter(|s| !s.is_empty());

    MergeOutcome { record, diff }
}

/// Pick one of two values under the precedence rule, recording a diff entry
/// when the sides disagree.
fn resolve(
    field: &str,
    local: &str,
    remote: &str,
    prefer_remote: bool,
    diff: &mut Vec<FieldDiff>,
) -> String {
    let chosen = match (local.is_empty(), remote.is_empty()) {
        (true, _) => remote,
        (_, true) => local,
        (false, false) => {
            if local != remote {
                let resolved = if prefer_remote { remote } else { local };
                diff.push(FieldDiff {
                    field: field.to_string(),
                    local_value: local.to_string(),
                    remote_value: remote.to_string(),
                    resolved_value: resolved.to_string(),
                });
            }
            if prefer_remote { remote } else { local }
        }
    };
    chosen.to_string()
}

/// Apply a single manual override to a merged record.
///
/// Contributor lists split on the `&` separator. Fields not listed here
/// cannot be edited interactively.
pub fn apply_override(record: &mut BookRecord, field: &str, value: &str) -> Result<()> {
    let value = value.trim();
    match field {
        "title" => record.title = value.to_string(),
        "subtitle" => record.subtitle = non_empty(value),
        "authors" => record.authors = split_names(value),
        "narrators" => record.narrators = split_names(value),
        "series" => record.series = non_empty(value),
        "series_part" => record.series_part = non_empty(value),
        "description" => record.description = non_empty(value),
        "year" => {
            record.year = if value.is_empty() {
                None
            } else {
                Some(value.parse().map_err(|_| {
                    Error::matching(format!("year must be a number, got '{value}'"))
                })?)
            }
        }
        "asin" => record.asin = non_empty(value).map(|s| s.to_ascii_uppercase()),
        "publisher" => record.publisher = non_empty(value),
        "language" => record.language = non_empty(value),
        other => return Err(Error::matching(format!("unknown field '{other}'"))),
    }
    Ok(())
}

/// Fields accepted by [`apply_override`], for the review prompt.
pub const EDITABLE_FIELDS: &[&str] = &[
    "title",
    "subtitle",
    "authors",
    "narrators",
    "series",
    "series_part",
    "description",
    "year",
    "asin",
    "publisher",
    "language",
];

/// Enforce the finalization invariant: a committed record has a title.
pub fn finalize(mut record: BookRecord) -> Result<BookRecord> {
    record.title = record.title.trim().to_string();
    if record.title.is_empty() {
        return Err(Error::matching("record has no title"));
    }
    Ok(record)
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

fn split_names(value: &str) -> Vec<String> {
    value
        .split('&')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
