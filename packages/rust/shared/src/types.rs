//! Core domain types for bundle resolution.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// BundleId
// ---------------------------------------------------------------------------

/// Opaque numeric-string identifier for a bundle, kept exactly as it
/// appears in storefront URLs and markup.
///
/// Never parsed into a number, never zero-padded or otherwise normalized.
/// Equality is plain string equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BundleId(String);

impl BundleId {
    /// Wrap a raw id string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The raw id string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BundleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for BundleId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for BundleId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

// ---------------------------------------------------------------------------
// BundleItem
// ---------------------------------------------------------------------------

/// One item included in a bundle.
///
/// Everything except the id is best-effort: a field the extractor cannot
/// parse is simply absent, never an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BundleItem {
    /// Numeric-string item id from the storefront.
    pub id: String,

    /// Display name, if one could be parsed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Capsule image URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,

    /// Total user review count.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review_count: Option<u64>,

    /// Positive-review percentage exactly as published upstream.
    /// Not clamped: out-of-range values pass through untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub positive_review_pct: Option<u32>,

    /// Price in major currency units, rounded to two decimals.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
}

impl BundleItem {
    /// A bare item with only its id known.
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            image_url: None,
            review_count: None,
            positive_review_pct: None,
            price: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Bundle
// ---------------------------------------------------------------------------

/// A commercial bundle that includes the subject item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bundle {
    /// Storefront bundle id.
    pub id: BundleId,

    /// Bundle title. Always non-empty: records without a parsable name
    /// are dropped before they reach consumers.
    pub name: String,

    /// Included items, deduplicated by item id with the subject filtered out.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<BundleItem>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundle_id_is_transparent_in_json() {
        let id = BundleId::new("8216");
        let json = serde_json::to_string(&id).expect("serialize");
        assert_eq!(json, "\"8216\"");

        let parsed: BundleId = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(parsed, id);
        assert_eq!(parsed.as_str(), "8216");
    }

    #[test]
    fn bundle_id_is_not_normalized() {
        // Leading zeros survive; these are names, not numbers.
        assert_ne!(BundleId::new("0042"), BundleId::new("42"));
        assert_eq!(BundleId::new("0042").to_string(), "0042");
    }

    #[test]
    fn bare_item_serializes_to_id_only() {
        let item = BundleItem::with_id("620");
        let json = serde_json::to_string(&item).expect("serialize");
        assert_eq!(json, "{\"id\":\"620\"}");
    }

    #[test]
    fn bundle_roundtrip() {
        let bundle = Bundle {
            id: BundleId::new("8216"),
            name: "Portal Bundle".into(),
            items: vec![BundleItem {
                id: "620".into(),
                name: Some("Portal 2".into()),
                image_url: Some("https://cdn.example/620/capsule.jpg".into()),
                review_count: Some(123_456),
                positive_review_pct: Some(97),
                price: Some(9.99),
            }],
        };

        let json = serde_json::to_string_pretty(&bundle).expect("serialize");
        let parsed: Bundle = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(parsed, bundle);
    }

    #[test]
    fn review_percent_out_of_range_passes_through() {
        let item = BundleItem {
            positive_review_pct: Some(150),
            ..BundleItem::with_id("620")
        };
        let json = serde_json::to_string(&item).expect("serialize");
        let parsed: BundleItem = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(parsed.positive_review_pct, Some(150));
    }
}
