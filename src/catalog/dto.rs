//! Audible catalog API Data Transfer Objects
//!
//! These types match EXACTLY what the catalog API returns.
//! DO NOT add fields that aren't in the API response.
//! DO NOT use these types outside the catalog module - convert to
//! [`crate::model::BookRecord`] via the adapter.
//!
//! Product lookups and keyword searches both return `product` objects; the
//! search variant carries fewer response groups, so almost everything is
//! optional here.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Envelope for a single-product lookup.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProductResponse {
    pub product: Product,
}

/// Envelope for a keyword search (best match first, remote ranking).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub products: Vec<Product>,
}

/// One catalog product.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Product {
    pub asin: Option<String>,
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub authors: Vec<Contributor>,
    pub narrators: Vec<Contributor>,
    /// A book can belong to several series; the first entry is primary.
    pub series: Vec<Series>,
    pub publisher_summary: Option<String>,
    /// YYYY-MM-DD
    pub release_date: Option<String>,
    pub ratings_summary: Option<RatingsSummary>,
    /// Image size (e.g. "1000") to URL
    pub product_images: BTreeMap<String, String>,
    pub publisher_name: Option<String>,
    pub language: Option<String>,
    pub runtime_length_min: Option<u64>,
}

/// Author or narrator credit.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Contributor {
    pub name: Option<String>,
}

/// Series membership.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Series {
    pub title: Option<String>,
    /// Position within the series; free text like "1" or "Book 3"
    pub sequence: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct RatingsSummary {
    pub average_rating: Option<f64>,
}

// ============================================================================
// CONTRACT TESTS
// These verify our DTOs match what the real API returns.
// If these fail, the API has changed and we need to update our DTOs.
// ============================================================================


#[cfg(test)]
pub(crate) use contract_tests::SAMPLE_PRODUCT_JSON;
