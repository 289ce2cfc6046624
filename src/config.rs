//! Configuration loading and validation.
//!
//! Settings live in a JSON file (`config.json`). Lookup order when no path
//! is given on the command line: the working directory, then the OS config
//! directory (`~/.config/book-minder/config.json` on Linux). A missing file
//! falls back to defaults; a file that fails to parse, or that contains
//! unrecognized keys, is a hard error so typos don't silently change
//! behavior.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Default filename for the config file.
pub const CONFIG_FILE_NAME: &str = "config.json";

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Catalog endpoint settings
    pub audible: CatalogConfig,

    /// Library layout and commit settings
    pub organizer: OrganizerConfig,

    /// Multi-value and date formatting rules
    pub formatting: FormattingConfig,

    /// Local/remote reconciliation rules
    pub matching: MatchingConfig,
}

/// Catalog endpoint templates.
///
/// The endpoints are not owned by this tool; the templates are configurable
/// so a different locale or mirror can be substituted. `{asin}`,
/// `{keywords}` and `{num_results}` are replaced at request time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CatalogConfig {
    /// Product lookup by ASIN
    pub product_endpoint: String,
    /// Free-text keyword search
    pub search_endpoint: String,
    /// Base URL for public product pages
    pub web_base: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            product_endpoint: concat!(
                "https://api.audible.com/1.0/catalog/products/{asin}",
                "?response_groups=contributors,media,product_desc,product_details,",
                "product_plans,rating,reviews,sample,series",
                "&image_sizes=500,700,1000"
            )
            .to_string(),
            search_endpoint: concat!(
                "https://api.audible.com/1.0/catalog/products",
                "?response_groups=product_attrs",
                "&num_results={num_results}",
                "&products_sort_by=Relevance",
                "&keywords={keywords}"
            )
            .to_string(),
            web_base: "https://www.audible.com".to_string(),
        }
    }
}

/// Library layout and commit settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OrganizerConfig {
    /// Output root when `--output` is not given
    pub default_output_dir: PathBuf,

    /// Destination path template relative to the output root.
    ///
    /// Placeholders: {Author}, {Authors}, {Series}, {SeriesPart}, {Title},
    /// {Year}, {ext}. Empty segments (e.g. no series) are dropped.
    pub naming_template: String,

    /// Move files into the library instead of copying
    pub move_files: bool,

    /// Ignore audio files smaller than this (filters samples and fragments)
    pub min_file_size_mb: u64,

    /// Cap for any single path segment, cut at a word boundary
    pub max_filename_length: usize,

    /// Write a comprehensive book.opf instead of desc.txt/reader.txt
    pub create_opf: bool,

    /// Processed-log location (default: `<output>/processed_metadata.json`)
    pub processed_log_path: Option<PathBuf>,
}

impl Default for OrganizerConfig {
    fn default() -> Self {
        Self {
            default_output_dir: PathBuf::from("./organized_library"),
            naming_template: "{Author}/{Series}/{Title} ({Year})/{Title} - {Authors}.{ext}"
                .to_string(),
            move_files: false,
            min_file_size_mb: 80,
            max_filename_length: 200,
            create_opf: true,
            processed_log_path: None,
        }
    }
}

/// Multi-value and date formatting rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FormattingConfig {
    /// Separator between multiple authors/narrators
    pub multi_value_delimiter: String,

    /// Use only the first author for the {Authors} placeholder
    pub single_album_artist: bool,

    /// Substitute the full release date for {Year}
    pub use_full_release_date_as_year: bool,
}

impl Default for FormattingConfig {
    fn default() -> Self {
        Self {
            multi_value_delimiter: " & ".to_string(),
            single_album_artist: false,
            use_full_release_date_as_year: false,
        }
    }
}

/// Local/remote reconciliation rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MatchingConfig {
    /// When both sides have a value, the catalog wins; set false to keep
    /// embedded tags and only fill gaps from the catalog.
    pub prefer_remote: bool,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self { prefer_remote: true }
    }
}

// ============================================================================
// Config File Operations
// ============================================================================

/// Fallback config location in the OS config directory.
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("book-minder").join(CONFIG_FILE_NAME))
}

/// Load configuration.
///
/// With an explicit path, the file must exist and parse. Without one, the
/// working directory and the OS config directory are tried in order, and a
/// missing file yields defaults.
pub fn load(explicit: Option<&Path>) -> Result<Config> {
    if let Some(path) = explicit {
        if !path.exists() {
            return Err(Error::config(format!(
                "config file not found: {}",
                path.display()
            )));
        }
        return parse_file(path);
    }

    let mut candidates = vec![PathBuf::from(CONFIG_FILE_NAME)];
    if let Some(user_path) = user_config_path() {
        candidates.push(user_path);
    }

    for path in candidates {
        if path.exists() {
            return parse_file(&path);
        }
    }

    tracing::info!("No config file found, using defaults");
    Ok(Config::default())
}

fn parse_file(path: &Path) -> Result<Config> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| Error::config(format!("failed to read {}: {}", path.display(), e)))?;
    let config: Config = serde_json::from_str(&contents)
        .map_err(|e| Error::config(format!("failed to parse {}: {}", path.display(), e)))?;
    tracing::info!("Loaded config from {}", path.display());
    Ok(config)
}

// ============================================================================
// Tests
// ============================================================================
