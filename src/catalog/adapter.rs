//! Adapter layer: Convert catalog DTOs to domain models
//!
//! This is the ONLY place where DTO types are converted to [`BookRecord`].
//! If the catalog changes its response format, only this file and dto.rs
//! need to change.
//!
//! Field mapping:
//!
//! | remote                                  | record        |
//! |-----------------------------------------|---------------|
//! | `product.asin`                          | `asin`        |
//! | `product.title` / `subtitle`            | `title` / `subtitle` |
//! | `product.authors[].name`                | `authors`     |
//! | `product.narrators[].name`              | `narrators`   |
//! | `product.series[0].title` / `.sequence` | `series` / `series_part` |
//! | `product.publisher_summary` (trimmed)   | `description` |
//! | `product.release_date` (+ parsed year)  | `release_date` / `year` |
//! | `product.ratings_summary.average_rating`| `rating`      |
//! | `product.product_images` 1000→700→500   | `cover_url`   |
//! | derived `{web_base}/pd/{asin}`          | `product_url` |
//! | `product.publisher_name` / `language`   | `publisher` / `language` |
//! | `product.runtime_length_min` (× 60)     | `runtime_secs`|

use super::dto;
use crate::model::BookRecord;

/// Preferred cover sizes, best first.
const COVER_SIZES: &[&str] = &["1000", "700", "500"];

/// Convert a catalog product to a [`BookRecord`].
///
/// `web_base` is the public product-page base used to derive `product_url`.
pub fn to_record(product: dto::Product, web_base: &str) -> BookRecord {
    let (series, series_part) = extract_series(&product.series);

    let year = product
        .release_date
        .as_deref()
        .and_then(year_from_release_date);

    let cover_url = pick_cover_url(&product.product_images);

    let product_url = product
        .asin
        .as_deref()
        .map(|asin| format!("{}/pd/{}", web_base.trim_end_matches('/'), asin));

    BookRecord {
        asin: product.asin,
        title: product.title.unwrap_or_default(),
        subtitle: product.subtitle,
        authors: contributor_names(&product.authors),
        narrators: contributor_names(&product.narrators),
        series,
        series_part,
        description: product
            .publisher_summary
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty()),
        release_date: product.release_date,
        year,
        rating: product.ratings_summary.and_then(|r| r.average_rating),
        cover_url,
        product_url,
        publisher: product.publisher_name,
        language: product.language,
        runtime_secs: product.runtime_length_min.map(|m| m * 60),
    }
}

fn contributor_names(contributors: &[dto::Contributor]) -> Vec<String> {
    contributors
        .iter()
        .filter_map(|c| c.name.as_deref())
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .collect()
}

/// Primary series title and normalized position.
fn extract_series(series: &[dto::Series]) -> (Option<String>, Option<String>) {
    let Some(first) = series.first() else {
        return (None, None);
    };

    let part = first.sequence.as_deref().map(normalize_series_part);

    (first.title.clone(), part.filter(|p| !p.is_empty()))
}

/// Normalize a series sequence: strip a "book" prefix, zero-pad when
/// numeric ("1" -> "01", "Book 3" -> "03"), pass anything else through.
fn normalize_series_part(sequence: &str) -> String {
    let cleaned = sequence.to_lowercase().replace("book", "");
    let cleaned = cleaned.trim();

    match cleaned.parse::<f64>() {
        Ok(n) => format!("{:02}", n as i64),
        Err(_) => cleaned.to_string(),
    }
}

/// Year is the leading component of a YYYY-MM-DD date.
fn year_from_release_date(release_date: &str) -> Option<i32> {
    release_date.split('-').next().and_then(|y| y.parse().ok())
}

fn pick_cover_url(images: &std::collections::BTreeMap<String, String>) -> Option<String> {
    COVER_SIZES
        .iter()
        .find_map(|size| images.get(*size).cloned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::dto::ProductResponse;

    /// The fixed sample payload must map exactly per the documented table.
    #[test]
    fn test_sample_payload_field_mapping() {
        let response: ProductResponse =
            serde_json::from_str(crate::catalog::dto::SAMPLE_PRODUCT_JSON).unwrap();

        let record = to_record(response.product, "https://www.audible.com");

        assert_eq!(record.asin.as_deref(), Some("B002V5BRQ6"));
        assert_eq!(record.title, "The Name of the Wind");
        assert_eq!(record.subtitle.as_deref(), Some("Kingkiller Chronicle, Book 1"));
        assert_eq!(record.authors, vec!["Patrick Rothfuss".to_string()]);
        assert_eq!(record.narrators, vec!["Nick Podehl".to_string()]);
        assert_eq!(record.series.as_deref(), Some("Kingkiller Chronicle"));
        assert_eq!(record.series_part.as_deref(), Some("01"));
        assert_eq!(
            record.description.as_deref(),
            Some("My name is Kvothe. I have stolen princesses back from sleeping barrow kings.")
        );
        assert_eq!(record.release_date.as_deref(), Some("2009-05-14"));
        assert_eq!(record.year, Some(2009));
        assert_eq!(record.rating, Some(4.45));
        assert_eq!(
            record.cover_url.as_deref(),
            Some("https://m.media-amazon.com/images/I/cover._SL1000_.jpg")
        );
        assert_eq!(
            record.product_url.as_deref(),
            Some("https://www.audible.com/pd/B002V5BRQ6")
        );
        assert_eq!(record.publisher.as_deref(), Some("Brilliance Audio"));
        assert_eq!(record.language.as_deref(), Some("english"));
        assert_eq!(record.runtime_secs, Some(1679 * 60));
    }

    #[test]
    fn test_empty_product_maps_to_empty_record() {
        let record = to_record(dto::Product::default(), "https://www.audible.com");

        assert!(record.asin.is_none());
        assert!(record.title.is_empty());
        assert!(record.authors.is_empty());
        assert!(record.product_url.is_none());
        assert!(record.cover_url.is_none());
    }

    #[test]
    fn test_normalize_series_part() {
        assert_eq!(normalize_series_part("1"), "01");
        assert_eq!(normalize_series_part("12"), "12");
        assert_eq!(normalize_series_part("Book 3"), "03");
        assert_eq!(normalize_series_part("book2"), "02");
        // Non-numeric sequences pass through
        assert_eq!(normalize_series_part("Omnibus"), "omnibus");
    }

    #[test]
    fn test_year_from_release_date() {
        assert_eq!(year_from_release_date("2009-05-14"), Some(2009));
        assert_eq!(year_from_release_date("1998"), Some(1998));
        assert_eq!(year_from_release_date("unknown"), None);
    }

    #[test]
    fn test_cover_url_prefers_largest() {
        let mut images = std::collections::BTreeMap::new();
        images.insert("500".to_string(), "small.jpg".to_string());
        assert_eq!(pick_cover_url(&images), Some("small.jpg".to_string()));

        images.insert("700".to_string(), "medium.jpg".to_string());
        assert_eq!(pick_cover_url(&images), Some("medium.jpg".to_string()));

        images.insert("1000".to_string(), "large.jpg".to_string());
        assert_eq!(pick_cover_url(&images), Some("large.jpg".to_string()));
    }

    #[test]
    fn test_blank_contributors_are_dropped() {
        let product = dto::Product {
            authors: vec![
                dto::Contributor {
                    name: Some(" Patrick Rothfuss ".to_string()),
                },
                dto::Contributor { name: None },
                dto::Contributor {
                    name: Some("".to_string()),
                },
            ],
            ..Default::default()
        };

        let record = to_record(product, "https://www.audible.com");
        assert_eq!(record.authors, vec!["Patrick Rothfuss".to_string()]);
    }
}
