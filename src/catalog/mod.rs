//! Audible catalog integration - looks up audiobooks by ASIN or keywords.
//!
//! # Architecture
//!
//! This module follows a clean separation between:
//! - **API DTOs** (`dto.rs`) - Exact API response shapes
//! - **Adapter** (`adapter.rs`) - Converts DTOs to [`crate::model::BookRecord`]
//! - **Client** (`client.rs`) - HTTP client against the templated endpoints
//! - **Traits** (`traits.rs`) - Mockable client interface for tests
//!
//! This decoupling means API changes don't ripple through the codebase, and
//! the field-mapping contract can be tested independently of the network.

pub mod adapter;
pub mod client;
pub mod dto;
pub mod traits;

pub use client::AudibleClient;
pub use traits::CatalogApi;

/// Errors from the catalog fetch stage.
///
/// Network and parse failures are distinct categories: the first is worth a
/// retry, the second means the remote shape changed.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CatalogError {
    #[error("network error: {0}")]
    Network(String),

    #[error("failed to parse response: {0}")]
    Parse(String),

    #[error("no catalog entry found")]
    NotFound,

    #[error("authentication failed (HTTP {0})")]
    Auth(u16),

    #[error("rate limited - try again later")]
    RateLimited,

    #[error("invalid endpoint template: {0}")]
    Endpoint(String),
}
