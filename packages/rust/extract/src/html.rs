//! Structured-markup extraction strategy.
//!
//! Parses full storefront HTML with `scraper`. Selectors are fixed strings
//! parsed per invocation; nothing here keeps state between calls.

use std::collections::HashSet;

use scraper::{ElementRef, Html, Selector};
use serde::Deserialize;
use tracing::debug;

use bundlescout_shared::{Bundle, BundleId, BundleItem, BundlescoutError, Result};

use crate::parse_price;

/// Attribute carrying the embedded JSON array of bundle ids on a list page.
const BUNDLE_IDS_ATTR: &str = "data-ds-bundleids";

/// Attribute aliases for the numeric item id on an item anchor.
const ITEM_ID_ATTRS: &[&str] = &["data-ds-appid", "data-appid"];
/// Attribute aliases for the item display name.
const ITEM_NAME_ATTRS: &[&str] = &["data-ds-itemname", "data-itemname"];
/// Attribute aliases for the total review count.
const REVIEW_COUNT_ATTRS: &[&str] = &["data-ds-review-count", "data-review-count"];
/// Attribute aliases for the positive-review percentage.
const REVIEW_PCT_ATTRS: &[&str] = &["data-ds-review-percent", "data-review-percent"];
/// Attribute aliases for the price in integer minor units.
const PRICE_ATTRS: &[&str] = &["data-price-final", "data-ds-price-final"];

// ---------------------------------------------------------------------------
// Candidate ids from the embedded payload
// ---------------------------------------------------------------------------

/// Parse every `data-ds-bundleids` JSON array in the document.
///
/// A malformed array propagates [`BundlescoutError::Payload`]; this is the
/// one extraction failure that is not swallowed. Entries that are neither
/// numbers nor numeric strings are skipped.
pub(crate) fn bundle_ids_from_attr(doc: &Html) -> Result<Vec<BundleId>> {
    let sel = Selector::parse("[data-ds-bundleids]").unwrap();

    let mut ids = Vec::new();
    for el in doc.select(&sel) {
        let Some(raw) = el.value().attr(BUNDLE_IDS_ATTR) else {
            continue;
        };
        let values: Vec<serde_json::Value> =
            serde_json::from_str(raw).map_err(|e| BundlescoutError::Payload {
                context: BUNDLE_IDS_ATTR.into(),
                source: e,
            })?;

        for value in values {
            match value {
                serde_json::Value::Number(n) => {
                    if let Some(id) = n.as_u64() {
                        ids.push(BundleId::new(id.to_string()));
                    }
                }
                serde_json::Value::String(s) => {
                    let s = s.trim();
                    if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) {
                        ids.push(BundleId::new(s));
                    }
                }
                other => {
                    debug!(entry = %other, "ignoring non-id entry in bundle id payload");
                }
            }
        }
    }
    Ok(ids)
}

// ---------------------------------------------------------------------------
// Bundle name
// ---------------------------------------------------------------------------

/// Bundle title from structured markup: the page header element first,
/// then the document title with the storefront suffix stripped.
pub(crate) fn bundle_name_from_markup(doc: &Html) -> Option<String> {
    let header_sel = Selector::parse("h2.pageheader").unwrap();
    if let Some(el) = doc.select(&header_sel).next() {
        let name = el.text().collect::<String>().trim().to_string();
        if !name.is_empty() {
            return Some(name);
        }
    }

    let title_sel = Selector::parse("title").unwrap();
    if let Some(el) = doc.select(&title_sel).next() {
        let raw = el.text().collect::<String>();
        let name = crate::strip_site_suffix(raw.trim()).trim();
        if !name.is_empty() {
            return Some(name.to_string());
        }
    }

    None
}

// ---------------------------------------------------------------------------
// Bundle items
// ---------------------------------------------------------------------------

/// Items from structured item anchors on a bundle page.
///
/// Each field is looked up independently; whatever cannot be parsed stays
/// absent. Items are deduplicated by id, first occurrence wins.
pub(crate) fn items_from_markup(doc: &Html) -> Vec<BundleItem> {
    let anchor_sel = Selector::parse("a[data-ds-appid], a[data-appid]").unwrap();

    let mut seen: HashSet<String> = HashSet::new();
    let mut items = Vec::new();

    for el in doc.select(&anchor_sel) {
        let Some(raw_id) = attr_first(el, ITEM_ID_ATTRS) else {
            continue;
        };
        let id = raw_id.trim();
        if id.is_empty() || !id.bytes().all(|b| b.is_ascii_digit()) {
            debug!(raw = raw_id, "skipping item anchor with non-numeric id");
            continue;
        }
        if !seen.insert(id.to_string()) {
            continue;
        }

        let name = attr_first(el, ITEM_NAME_ATTRS)
            .map(str::to_string)
            .or_else(|| first_text(el, ".tab_item_name"))
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());

        let image_url = first_attr(el, "img", "src")
            .map(str::to_string)
            .filter(|u| !u.is_empty());

        let review_count =
            attr_first(el, REVIEW_COUNT_ATTRS).and_then(|v| v.trim().parse::<u64>().ok());
        let positive_review_pct =
            attr_first(el, REVIEW_PCT_ATTRS).and_then(|v| v.trim().parse::<u32>().ok());

        // Attribute values carry minor units; the rendered price element
        // carries major units. parse_price distinguishes by separator.
        let price = attr_first(el, PRICE_ATTRS)
            .and_then(parse_price)
            .or_else(|| {
                first_text(el, ".discount_final_price")
                    .as_deref()
                    .and_then(parse_price)
            });

        items.push(BundleItem {
            id: id.to_string(),
            name,
            image_url,
            review_count,
            positive_review_pct,
            price,
        });
    }

    items
}

// ---------------------------------------------------------------------------
// Direct membership anchors
// ---------------------------------------------------------------------------

/// Purchase-area payload embedded next to a bundle id:
/// `{"m_rgItems":[{"m_rgIncludedAppIDs":[..]}]}`.
#[derive(Debug, Deserialize)]
struct BundlePayload {
    #[serde(default, rename = "m_rgItems")]
    items: Vec<BundlePayloadItem>,
}

#[derive(Debug, Deserialize)]
struct BundlePayloadItem {
    #[serde(default, rename = "m_rgIncludedAppIDs")]
    included_app_ids: Vec<u64>,
}

/// Bundles whose embedded inclusion payload names the subject.
///
/// Unlike the list-page id payload, a malformed per-anchor payload only
/// skips that anchor. Anchors without a usable title are skipped too.
pub(crate) fn bundles_for_subject_in_markup(doc: &Html, subject_id: &str) -> Vec<Bundle> {
    let anchor_sel = Selector::parse("[data-ds-bundleid]").unwrap();
    let title_sel = Selector::parse("h1, h2.title").unwrap();

    let subject_num: Option<u64> = subject_id.trim().parse().ok();

    let mut seen: HashSet<String> = HashSet::new();
    let mut bundles = Vec::new();

    for el in doc.select(&anchor_sel) {
        let Some(id) = el
            .value()
            .attr("data-ds-bundleid")
            .map(str::trim)
            .filter(|s| !s.is_empty())
        else {
            continue;
        };
        let Some(payload) = el.value().attr("data-ds-bundle-data") else {
            continue;
        };

        let parsed: BundlePayload = match serde_json::from_str(payload) {
            Ok(p) => p,
            Err(e) => {
                debug!(
                    bundle_id = id,
                    error = %e,
                    "skipping membership anchor with malformed payload"
                );
                continue;
            }
        };

        let includes_subject = subject_num.is_some_and(|n| {
            parsed
                .items
                .iter()
                .any(|item| item.included_app_ids.contains(&n))
        });
        if !includes_subject {
            continue;
        }

        let Some(raw_title) = el
            .select(&title_sel)
            .next()
            .map(|t| t.text().collect::<String>())
        else {
            continue;
        };
        let title = raw_title.trim();
        let title = title.strip_prefix("Buy ").unwrap_or(title).trim();
        if title.is_empty() {
            continue;
        }

        if !seen.insert(id.to_string()) {
            continue;
        }
        bundles.push(Bundle {
            id: BundleId::new(id),
            name: title.to_string(),
            items: Vec::new(),
        });
    }

    bundles
}

// ---------------------------------------------------------------------------
// Element helpers
// ---------------------------------------------------------------------------

/// First present attribute among an alias list.
fn attr_first<'a>(el: ElementRef<'a>, names: &[&str]) -> Option<&'a str> {
    names.iter().find_map(|name| el.value().attr(name))
}

/// Collected text of the first descendant matching a selector.
fn first_text(el: ElementRef<'_>, selector: &str) -> Option<String> {
    let sel = Selector::parse(selector).unwrap();
    el.select(&sel)
        .next()
        .map(|n| n.text().collect::<String>())
}

/// An attribute of the first descendant matching a selector.
fn first_attr<'a>(el: ElementRef<'a>, selector: &str, attr: &str) -> Option<&'a str> {
    let sel = Selector::parse(selector).unwrap();
    el.select(&sel).next().and_then(|n| n.value().attr(attr))
}
