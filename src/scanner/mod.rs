//! Input directory scanning.
//!
//! Walks the input tree and keeps files that look like audiobooks:
//! supported extension, at least the configured size (samples and chapter
//! fragments are smaller), not already in the processed log, and not
//! already parked in the failed folder.

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::organizer::FAILED_DIR;
use crate::skiplog::ProcessedLog;

/// Supported audiobook extensions (case-insensitive).
pub const SUPPORTED_EXTENSIONS: &[&str] = &["aax", "m4b", "mp3", "m4a"];

/// Check if a path has a supported audiobook extension.
pub fn is_audio_file(path: &Path) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_lowercase())
        .is_some_and(|ext| SUPPORTED_EXTENSIONS.contains(&ext.as_str()))
}

/// Find audio files under `input_dir` that still need processing.
///
/// Results come back sorted for a deterministic batch order.
pub fn find_new_files(
    input_dir: &Path,
    processed: &ProcessedLog,
    min_file_size_mb: u64,
) -> Vec<PathBuf> {
    let min_size_bytes = min_file_size_mb * 1024 * 1024;
    let mut files: Vec<PathBuf> = Vec::new();

    tracing::info!("Scanning for audio files in {}", input_dir.display());

    for entry in WalkDir::new(input_dir).into_iter().filter_map(|e| e.ok()) {
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();

        if path.components().any(|c| c.as_os_str() == FAILED_DIR) {
            continue;
        }
        if !is_audio_file(path) {
            continue;
        }
        if processed.contains(path) {
            tracing::debug!("Skipping already processed file: {}", path.display());
            continue;
        }

        match entry.metadata() {
            Ok(meta) if meta.len() < min_size_bytes => {
                tracing::info!(
                    "Skipping small file: {} [{:.2}MB]",
                    path.display(),
                    meta.len() as f64 / (1024.0 * 1024.0)
                );
                continue;
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!("Could not read size of {}: {e}", path.display());
                continue;
            }
        }

        files.push(path.to_path_buf());
    }

    files.sort();
    tracing::info!(
        "Found {} new audio files to process (>= {min_file_size_mb}MB)",
        files.len()
    );
    files
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skiplog::{ProcessedEntry, ProcessedLog};
    use std::fs;
    use tempfile::tempdir;

    fn empty_log(dir: &Path) -> ProcessedLog {
        ProcessedLog::load(dir.join("processed_metadata.json"))
    }

    #[test]
    fn test_is_audio_file() {
        assert!(is_audio_file(Path::new("book.m4b")));
        assert!(is_audio_file(Path::new("book.AAX")));
        assert!(is_audio_file(Path::new("book.mp3")));
        assert!(!is_audio_file(Path::new("book.flac")));
        assert!(!is_audio_file(Path::new("notes.txt")));
        assert!(!is_audio_file(Path::new("no_extension")));
    }

    #[test]
    fn test_find_new_files_filters_extension_and_subdirs() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join("one.m4b"), b"x").unwrap();
        fs::write(temp.path().join("skip.txt"), b"x").unwrap();
        let sub = temp.path().join("nested");
        fs::create_dir(&sub).unwrap();
        fs::write(sub.join("two.mp3"), b"x").unwrap();

        let files = find_new_files(temp.path(), &empty_log(temp.path()), 0);

        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["one.m4b".to_string(), "two.mp3".to_string()]);
    }

    #[test]
    fn test_find_new_files_respects_min_size() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join("tiny.m4b"), b"tiny").unwrap();
        fs::write(temp.path().join("big.m4b"), vec![0u8; 2 * 1024 * 1024]).unwrap();

        let files = find_new_files(temp.path(), &empty_log(temp.path()), 1);

        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("big.m4b"));
    }

    #[test]
    fn test_find_new_files_skips_processed() {
        let temp = tempdir().unwrap();
        let book = temp.path().join("done.m4b");
        fs::write(&book, b"x").unwrap();

        let mut log = empty_log(temp.path());
        log.record(
            &book,
            ProcessedEntry::new("/out/done.m4b", &crate::model::BookRecord::default()),
        )
        .unwrap();

        // Rerun over the same tree: nothing new to do
        let files = find_new_files(temp.path(), &log, 0);
        assert!(files.is_empty());
    }

    #[test]
    fn test_find_new_files_skips_failed_folder() {
        let temp = tempdir().unwrap();
        let failed = temp.path().join(FAILED_DIR);
        fs::create_dir(&failed).unwrap();
        fs::write(failed.join("broken.m4b"), b"x").unwrap();

        let files = find_new_files(temp.path(), &empty_log(temp.path()), 0);
        assert!(files.is_empty());
    }
}
