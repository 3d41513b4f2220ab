//! Offer record and metadata types.
//!
//! An `OfferRecord` is one scraped promotional deal. Its `link` is the identity
//! key: two records with the same link are the same offer, and a record without
//! a link cannot be indexed at all.

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

/// Placeholder rendered for metadata fields the scraper did not provide.
pub const NOT_AVAILABLE: &str = "N/A";

/// One scraped promotional offer, as produced by the scraping layer.
///
/// All fields are free-form strings; scrapers are inconsistent about which
/// ones they fill in. `discount` sometimes arrives as a bare JSON number,
/// so it is stringified during deserialization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OfferRecord {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub brand: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub discount: String,
    /// Free-form expiry text; empty means unknown.
    #[serde(default)]
    pub expiry: String,
    /// Offer URL. This is the identity key for deduplication.
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub channel: String,
}

impl OfferRecord {
    /// Whether this record carries an identity and can be indexed.
    pub fn is_indexable(&self) -> bool {
        !self.link.trim().is_empty()
    }

    /// The text that gets embedded for this offer.
    ///
    /// Pure function of `title` and `description`; the retrieval tests rely
    /// on this being deterministic.
    pub fn embed_text(&self) -> String {
        format!("{}. {}", self.title, self.description)
    }

    /// Structured metadata stored alongside the indexed document.
    ///
    /// The link is trimmed so it always equals the index key.
    pub fn metadata(&self) -> OfferMetadata {
        OfferMetadata {
            brand: self.brand.clone(),
            link: self.link.trim().to_string(),
            discount: none_if_empty(&self.discount),
            expiry: none_if_empty(&self.expiry),
            category: none_if_empty(&self.category),
            image: none_if_empty(&self.image),
            channel: none_if_empty(&self.channel),
        }
    }
}

/// Structured metadata for an indexed offer.
///
/// Fields the scrapers fill inconsistently are explicit `Option`s; the empty
/// string never round-trips into storage. Rendering code substitutes
/// [`NOT_AVAILABLE`] where a field is absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfferMetadata {
    pub brand: String,
    pub link: String,
    #[serde(default)]
    pub discount: Option<String>,
    #[serde(default)]
    pub expiry: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub channel: Option<String>,
}

impl OfferMetadata {
    /// Discount text, or the placeholder when absent.
    pub fn discount_or_placeholder(&self) -> &str {
        self.discount.as_deref().unwrap_or(NOT_AVAILABLE)
    }

    /// Expiry text, or the placeholder when absent.
    pub fn expiry_or_placeholder(&self) -> &str {
        self.expiry.as_deref().unwrap_or(NOT_AVAILABLE)
    }
}

fn none_if_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Accept a string, number, or null and normalize to a string.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    struct Visitor;

    impl de::Visitor<'_> for Visitor {
        type Value = String;

        fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
            f.write_str("a string, number, or null")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_unit<E: de::Error>(self) -> Result<String, E> {
            Ok(String::new())
        }

        fn visit_none<E: de::Error>(self) -> Result<String, E> {
            Ok(String::new())
        }
    }

    deserializer.deserialize_any(Visitor)
}
