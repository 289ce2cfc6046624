//! Per-file pipeline orchestration.
//!
//! For each audio file the pipeline runs a fixed sequence of stages:
//! identification (the four-step ASIN waterfall below), catalog fetch,
//! local/remote merge, and finally the filesystem commit. The review step
//! between merge and commit belongs to the front end; this module exposes
//! the state it needs.
//!
//! ASIN resolution order, most to least reliable:
//! 1. Explicit ASIN map file (`--asin-map`)
//! 2. Embedded tag or filename ASIN
//! 3. Keyword search from embedded title + author
//! 4. Keyword search from the cleaned filename (and parent folder)

use regex::Regex;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::LazyLock;

use crate::catalog::CatalogApi;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::matcher::{self, MergeOutcome};
use crate::model::{BookRecord, EmbeddedCover, LocalFileInfo};
use crate::organizer::{self, DestinationPlan};
use crate::sidecar;
use crate::tags;

/// Series markers worth preserving in a search term ("Book 3", "pt II").
static KEEP_WORDS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(book|part|bk|pt|act)\b[ \-]*(\d+|[IVXLCDM]+)\b")
        .expect("valid keep-words pattern")
});

/// Filename separators that turn into spaces for searching.
static SEPARATOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[_\-.]+").expect("valid separator pattern"));

static MULTI_SPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace pattern"));

/// How the ASIN for a file was determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AsinSource {
    MapFile,
    EmbeddedTag,
    Filename,
    TagSearch,
    FilenameSearch,
    /// Entered by the user during review
    Manual,
}

impl fmt::Display for AsinSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::MapFile => "ASIN map",
            Self::EmbeddedTag => "embedded tag",
            Self::Filename => "filename",
            Self::TagSearch => "tag search",
            Self::FilenameSearch => "filename search",
            Self::Manual => "manual entry",
        };
        f.write_str(name)
    }
}

/// A file the pipeline managed to identify.
#[derive(Debug)]
pub struct Identified {
    pub local: LocalFileInfo,
    pub asin_source: AsinSource,
    pub merge: MergeOutcome,
    /// Search hits when the ASIN came from a keyword search; offered to the
    /// user as alternatives, empty for direct resolutions
    pub candidates: Vec<BookRecord>,
}

/// Outcome of the identification stages for one file.
#[derive(Debug)]
pub enum Prepared {
    Identified(Box<Identified>),
    /// Every resolution strategy came up empty
    NoMatch(LocalFileInfo),
}

/// The sequential per-file pipeline.
pub struct Pipeline<'a, C> {
    catalog: &'a C,
    config: &'a Config,
}

impl<'a, C: CatalogApi> Pipeline<'a, C> {
    pub fn new(catalog: &'a C, config: &'a Config) -> Self {
        Self { catalog, config }
    }

    /// Run identification, fetch, and merge for one file.
    ///
    /// Returns a read error for files that are not audio containers; the
    /// caller skips those and continues the batch.
    pub async fn prepare(
        &self,
        path: &Path,
        asin_map: &HashMap<String, String>,
        input_dir: &Path,
    ) -> Result<Prepared> {
        let local = tags::read(path)?;

        let (asin, asin_source, candidates) =
            match self.resolve_asin(&local, asin_map, input_dir).await {
                Some(resolution) => resolution,
                None => return Ok(Prepared::NoMatch(local)),
            };

        tracing::info!("Resolved {} via {asin_source}: {asin}", path.display());

        let record = self.catalog.fetch_by_asin(&asin).await?;
        let merge = matcher::merge(&local, Some(&record), self.config.matching.prefer_remote);

        Ok(Prepared::Identified(Box::new(Identified {
            local,
            asin_source,
            merge,
            candidates,
        })))
    }

    /// Re-merge against a different candidate chosen during review.
    pub async fn remerge(&self, local: &LocalFileInfo, asin: &str) -> Result<MergeOutcome> {
        let record = self.catalog.fetch_by_asin(asin).await?;
        Ok(matcher::merge(
            local,
            Some(&record),
            self.config.matching.prefer_remote,
        ))
    }

    /// Commit a finalized record: create the folder, move/copy the audio,
    /// fetch the cover, write the sidecars, in that order.
    ///
    /// A failed cover download is logged and falls back to the embedded
    /// cover; it never blocks the sidecars. A failed sidecar write undoes
    /// the audio commit so the source is not left half-processed.
    pub async fn commit(
        &self,
        source: Option<&Path>,
        record: &BookRecord,
        local_cover: Option<&EmbeddedCover>,
        output_dir: &Path,
        move_files: bool,
    ) -> Result<DestinationPlan> {
        let plan = organizer::plan_paths(record, source, output_dir, self.config)?;
        organizer::ensure_folder(&plan.folder)?;

        if let (Some(src), Some(dest)) = (source, plan.audio_file.as_deref()) {
            organizer::commit_audio(src, dest, move_files)?;
        }

        if let Some(bytes) = self.obtain_cover(record, local_cover).await {
            sidecar::write_cover(&plan.folder, &bytes)?;
        }

        if let Err(e) = sidecar::write_all(record, &plan.folder, self.config) {
            if let (Some(src), Some(dest)) = (source, plan.audio_file.as_deref()) {
                if let Err(undo_err) = organizer::undo_commit(src, dest, move_files) {
                    tracing::error!("Could not restore {}: {undo_err}", src.display());
                }
            }
            return Err(e);
        }

        Ok(plan)
    }

    /// The four-stage waterfall. Search-based stages also return the raw
    /// hits so the front end can offer alternatives.
    async fn resolve_asin(
        &self,
        local: &LocalFileInfo,
        asin_map: &HashMap<String, String>,
        input_dir: &Path,
    ) -> Option<(String, AsinSource, Vec<BookRecord>)> {
        let path = &local.path;
        let file_name = path.file_name()?.to_string_lossy().to_string();

        // 1. Explicit map
        if let Some(asin) = asin_map.get(&file_name) {
            return Some((asin.clone(), AsinSource::MapFile, Vec::new()));
        }

        // 2. Embedded tag, then filename
        if let Some(asin) = &local.asin {
            return Some((asin.clone(), AsinSource::EmbeddedTag, Vec::new()));
        }
        if let Some(asin) = tags::asin_from_filename(path) {
            return Some((asin, AsinSource::Filename, Vec::new()));
        }

        // 3. Tag-based keyword search
        if let (Some(title), Some(author)) = (&local.title, &local.author) {
            let term = format!("{author} {title}");
            tracing::info!("Searching by embedded tags: {term}");
            if let Some(resolution) = self.search_for_asin(&term, AsinSource::TagSearch).await {
                return Some(resolution);
            }
        }

        // 4. Cleaned-filename search; include the parent folder name unless
        // the file sits directly in the input root
        let combined = match path.parent() {
            Some(parent) if parent != input_dir => {
                format!("{} {}", parent.file_name()?.to_string_lossy(), file_name)
            }
            _ => file_name,
        };
        let term = clean_search_term(&combined);
        if term.is_empty() {
            return None;
        }
        tracing::info!("Searching by filename: {term}");
        self.search_for_asin(&term, AsinSource::FilenameSearch).await
    }

    async fn search_for_asin(
        &self,
        term: &str,
        source: AsinSource,
    ) -> Option<(String, AsinSource, Vec<BookRecord>)> {
        match self.catalog.search(term, 5).await {
            Ok(hits) => {
                let asin = hits.first().and_then(|h| h.asin.clone())?;
                Some((asin, source, hits))
            }
            Err(e) => {
                tracing::warn!("Search failed for '{term}': {e}");
                None
            }
        }
    }

    async fn obtain_cover(
        &self,
        record: &BookRecord,
        local_cover: Option<&EmbeddedCover>,
    ) -> Option<Vec<u8>> {
        if let Some(url) = record.cover_url.as_deref() {
            match self.catalog.download_cover(url).await {
                Ok(bytes) => return Some(bytes),
                Err(e) => {
                    tracing::warn!("Cover download failed ({e}), trying embedded art");
                }
            }
        }
        local_cover.map(|c| c.data.clone())
    }
}

/// Load a filename-to-ASIN map from a `.json` object or a `.csv` of
/// `filename,asin` lines. Missing or unreadable maps log and return empty.
pub fn load_asin_map(path: Option<&Path>) -> HashMap<String, String> {
    let Some(path) = path else {
        return HashMap::new();
    };
    if !path.exists() {
        tracing::warn!("ASIN map file not found: {}", path.display());
        return HashMap::new();
    }

    let result: Result<HashMap<String, String>> = (|| {
        let contents = std::fs::read_to_string(path).map_err(Error::Io)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => serde_json::from_str(&contents)
                .map_err(|e| Error::config(format!("invalid ASIN map: {e}"))),
            Some("csv") => Ok(contents
                .lines()
                .filter_map(|line| {
                    let (file, asin) = line.split_once(',')?;
                    let (file, asin) = (file.trim(), asin.trim());
                    if file.is_empty() || asin.is_empty() {
                        None
                    } else {
                        Some((file.to_string(), asin.to_string()))
                    }
                })
                .collect()),
            _ => Err(Error::config(format!(
                "unknown ASIN map format: {} (must be .json or .csv)",
                path.display()
            ))),
        }
    })();

    match result {
        Ok(map) => {
            tracing::info!("Loaded {} ASIN mappings from {}", map.len(), path.display());
            map
        }
        Err(e) => {
            tracing::error!("Failed to load ASIN map: {e}");
            HashMap::new()
        }
    }
}

/// Turn a filename into a search term: separators become spaces, series
/// markers ("Book 3") are pulled out and re-appended so they survive the
/// cleanup.
pub fn clean_search_term(name: &str) -> String {
    let stem = Path::new(name)
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| name.to_string());

    let spaced = SEPARATOR_RE.replace_all(&stem, " ");

    let series_parts: Vec<String> = KEEP_WORDS_RE
        .captures_iter(&spaced)
        .map(|c| format!("{} {}", &c[1], &c[2]))
        .collect();

    let cleaned = KEEP_WORDS_RE.replace_all(&spaced, "");

    let combined = format!("{} {}", cleaned.trim(), series_parts.join(" "));
    MULTI_SPACE_RE.replace_all(combined.trim(), " ").to_string()
}
