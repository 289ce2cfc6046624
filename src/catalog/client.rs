//! Audible catalog HTTP client
//!
//! Talks to the public catalog endpoints configured in
//! [`CatalogConfig`](crate::config::CatalogConfig). No authentication is
//! required for catalog lookups; 401/403 responses are still surfaced
//! distinctly because some locales gate certain products.

use super::{CatalogError, adapter, dto};
use crate::config::CatalogConfig;
use crate::model::BookRecord;
use std::time::Duration;

/// Request timeout, matching the sequential one-file-at-a-time model.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

const USER_AGENT: &str = concat!(
    "BookMinder/",
    env!("CARGO_PKG_VERSION"),
    " (https://github.com/book-minder)"
);

/// Catalog API client.
pub struct AudibleClient {
    http_client: reqwest::Client,
    product_endpoint: String,
    search_endpoint: String,
    web_base: String,
}

impl AudibleClient {
    /// Create a client from the configured endpoint templates.
    pub fn new(config: &CatalogConfig) -> Self {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("Failed to build HTTP client");

        Self {
            http_client,
            product_endpoint: config.product_endpoint.clone(),
            search_endpoint: config.search_endpoint.clone(),
            web_base: config.web_base.clone(),
        }
    }

    /// Look up a product by ASIN.
    ///
    /// The direct lookup endpoint is fast but occasionally misses entries
    /// the keyword index knows about, so a failed direct lookup falls back
    /// to a keyword search for the ASIN. The fallback result is only
    /// accepted when it confirms the same ASIN.
    pub async fn fetch_by_asin(&self, asin: &str) -> Result<BookRecord, CatalogError> {
        match self.fetch_product(asin).await {
            Ok(record) => return Ok(record),
            Err(CatalogError::NotFound) => {
                tracing::warn!("Direct lookup failed for {asin}, falling back to keyword search");
            }
            Err(e) => return Err(e),
        }

        let hits = self.search(asin, 1).await?;
        match hits.first().and_then(|hit| hit.asin.as_deref()) {
            Some(found) if found.eq_ignore_ascii_case(asin) => {
                // Search results are thin; refetch the full product
                self.fetch_product(asin).await
            }
            Some(other) => {
                tracing::warn!("Keyword search for {asin} returned a different ASIN: {other}");
                Err(CatalogError::NotFound)
            }
            None => Err(CatalogError::NotFound),
        }
    }

    /// Free-text keyword search; candidates come back best-match-first as
    /// ranked by the remote.
    pub async fn search(
        &self,
        keywords: &str,
        num_results: usize,
    ) -> Result<Vec<BookRecord>, CatalogError> {
        if !self.search_endpoint.contains("{keywords}") {
            return Err(CatalogError::Endpoint(
                "search endpoint template is missing {keywords}".to_string(),
            ));
        }

        let url = self
            .search_endpoint
            .replace("{keywords}", &urlencoding::encode(keywords))
            .replace("{num_results}", &num_results.to_string());

        tracing::debug!("Searching catalog: {keywords}");
        let response = self.get_json::<dto::SearchResponse>(&url).await?;

        Ok(response
            .products
            .into_iter()
            .map(|p| adapter::to_record(p, &self.web_base))
            .collect())
    }

    /// Download a cover image, returning the raw bytes.
    pub async fn download_cover(&self, url: &str) -> Result<Vec<u8>, CatalogError> {
        tracing::debug!("Downloading cover: {url}");
        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| CatalogError::Network(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(CatalogError::NotFound);
        }
        if !status.is_success() {
            return Err(CatalogError::Network(format!(
                "HTTP {}: {}",
                status,
                status.canonical_reason().unwrap_or("Unknown")
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| CatalogError::Network(e.to_string()))?;
        Ok(bytes.to_vec())
    }

    async fn fetch_product(&self, asin: &str) -> Result<BookRecord, CatalogError> {
        if !self.product_endpoint.contains("{asin}") {
            return Err(CatalogError::Endpoint(
                "product endpoint template is missing {asin}".to_string(),
            ));
        }

        let url = self.product_endpoint.replace("{asin}", asin);

        tracing::debug!("Fetching product for ASIN {asin}");
        let response = self.get_json::<dto::ProductResponse>(&url).await?;
        Ok(adapter::to_record(response.product, &self.web_base))
    }

    /// Send a GET request and parse the JSON response.
    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
    ) -> Result<T, CatalogError> {
        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| CatalogError::Network(e.to_string()))?;

        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(CatalogError::NotFound);
        }
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(CatalogError::Auth(status.as_u16()));
        }
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(CatalogError::RateLimited);
        }
        if !status.is_success() {
            return Err(CatalogError::Network(format!(
                "HTTP {}: {}",
                status,
                status.canonical_reason().unwrap_or("Unknown")
            )));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| CatalogError::Parse(e.to_string()))
    }
}
