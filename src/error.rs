//! Application-wide error types.
//!
//! Library modules use specific error types via `thiserror`, while
//! CLI/main uses `anyhow` for convenient error propagation.
//!
//! # Design
//!
//! - [`Error`]: Top-level application error enum
//! - Module-specific errors (e.g., [`CatalogError`], [`OrganizeError`]) for
//!   detailed handling
//! - All errors implement `std::error::Error` for compatibility
//!
//! The error categories line up with the pipeline stages: a read error means
//! a bad local file and skips that file, a catalog error surfaces to the user
//! for retry or manual entry, an organize error aborts that file's commit
//! without mutating the source.

use std::path::PathBuf;

pub use crate::catalog::CatalogError;
pub use crate::organizer::OrganizeError;

/// Application-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level application error.
///
/// Aggregates errors from all subsystems for unified handling.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// File I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Tag reading error (unsupported or corrupt audio container)
    #[error("Read error for {path}: {message}")]
    Read { path: PathBuf, message: String },

    /// Catalog fetch/parse error
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Merge/finalization error
    #[error("Match error: {0}")]
    Match(String),

    /// Filesystem commit error
    #[error("Organization error: {0}")]
    Organize(#[from] OrganizeError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Create a read error.
    pub fn read(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Read {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a match error.
    pub fn matching(message: impl Into<String>) -> Self {
        Self::Match(message.into())
    }

    /// Create a config error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Add context to an error.
    pub fn context(self, ctx: impl Into<String>) -> Self {
        Self::WithContext {
            context: ctx.into(),
            source: Box::new(self),
        }
    }

    /// True when the error came from the catalog stage (network or parse),
    /// which is the category the user may retry or resolve manually.
    pub fn is_catalog(&self) -> bool {
        match self {
            Self::Catalog(_) => true,
            Self::WithContext { source, .. } => source.is_catalog(),
            _ => false,
        }
    }
}

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn with_context(self, ctx: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn with_context(self, ctx: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.context(ctx))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, std::io::Error> {
    fn with_context(self, ctx: impl Into<String>) -> Result<T> {
        self.map_err(|e| Error::Io(e).context(ctx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::read("/library/book.m4b", "not an audio container");
        let msg = err.to_string();
        assert!(msg.contains("book.m4b"));
        assert!(msg.contains("not an audio container"));
    }

    #[test]
    fn test_error_with_context() {
        let err = Error::matching("title missing").context("while finalizing record");
        let msg = err.to_string();
        assert!(msg.contains("while finalizing record"));
    }

    #[test]
    fn test_is_catalog_through_context() {
        let err = Error::Catalog(CatalogError::NotFound).context("fetching B002V5BRQ6");
        assert!(err.is_catalog());

        let err = Error::config("bad key");
        assert!(!err.is_catalog());
    }

    #[test]
    fn test_result_ext() {
        let result: Result<()> = Err(Error::matching("test"));
        let with_ctx = result.with_context("additional context");
        assert!(with_ctx.unwrap_err().to_string().contains("additional context"));
    }
}
