//! Trait definition for the catalog client.
//!
//! The pipeline is generic over [`CatalogApi`] so tests can run against a
//! mock catalog instead of the network. Production code uses
//! [`AudibleClient`](super::AudibleClient).

use async_trait::async_trait;

use super::CatalogError;
use crate::model::BookRecord;

/// Catalog lookup operations used by the pipeline.
#[async_trait]
pub trait CatalogApi: Send + Sync {
    /// Look up a product by ASIN.
    async fn fetch_by_asin(&self, asin: &str) -> Result<BookRecord, CatalogError>;

    /// Free-text search, best match first.
    async fn search(
        &self,
        keywords: &str,
        num_results: usize,
    ) -> Result<Vec<BookRecord>, CatalogError>;

    /// Download a cover image.
    async fn download_cover(&self, url: &str) -> Result<Vec<u8>, CatalogError>;
}

#[async_trait]
impl CatalogApi for super::AudibleClient {
    async fn fetch_by_asin(&self, asin: &str) -> Result<BookRecord, CatalogError> {
        self.fetch_by_asin(asin).await
    }

    async fn search(
        &self,
        keywords: &str,
        num_results: usize,
    ) -> Result<Vec<BookRecord>, CatalogError> {
        self.search(keywords, num_results).await
    }

    async fn download_cover(&self, url: &str) -> Result<Vec<u8>, CatalogError> {
        self.download_cover(url).await
    }
}
