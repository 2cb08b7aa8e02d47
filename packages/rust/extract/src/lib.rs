//! Dual-format extraction of bundle data from storefront pages.
//!
//! A fetched page arrives in one of two shapes: the storefront's own HTML,
//! or a sanitized markdown rendering produced by a reader proxy. Neither
//! shape is knowable in advance, so every operation here runs a structured
//! strategy over parsed markup and a text strategy over raw lines, merging
//! or falling back between them. Callers never need to know which shape
//! they were handed.

mod html;
mod markdown;

use std::collections::HashSet;

use scraper::Html;
use tracing::{debug, instrument};

use bundlescout_shared::{Bundle, BundleId, BundleItem, Result};

// ---------------------------------------------------------------------------
// Subject page operations
// ---------------------------------------------------------------------------

/// Collect every bundle id referenced by a subject's page.
///
/// Unions the structured `data-ds-bundleids` payload with `/bundle/{id}`
/// links found anywhere in the text, preserving first-seen order with the
/// payload ids ahead of link-only ids. A payload attribute that is present
/// but not valid JSON is an error; pages without one are simply empty.
#[instrument(skip_all, fields(len = text.len()))]
pub fn candidate_bundle_ids(text: &str) -> Result<Vec<BundleId>> {
    let doc = Html::parse_document(text);
    let payload_ids = html::bundle_ids_from_attr(&doc)?;
    let link_ids = markdown::bundle_ids_from_links(text);

    let mut seen: HashSet<String> = HashSet::new();
    let ids: Vec<BundleId> = payload_ids
        .into_iter()
        .chain(link_ids)
        .filter(|id| seen.insert(id.as_str().to_string()))
        .collect();
    debug!(count = ids.len(), "collected candidate bundle ids");
    Ok(ids)
}

/// Bundles whose purchase widgets on the subject's page list the subject
/// among their included items.
///
/// These records carry a name but no items; they seed results that a later
/// detail fetch may replace with a fully itemized bundle.
#[instrument(skip_all, fields(subject = %subject_id))]
pub fn bundles_for_subject(text: &str, subject_id: &str) -> Vec<Bundle> {
    let doc = Html::parse_document(text);
    let bundles = html::bundles_for_subject_in_markup(&doc, subject_id);
    debug!(count = bundles.len(), "collected membership bundles");
    bundles
}

// ---------------------------------------------------------------------------
// Bundle page operations
// ---------------------------------------------------------------------------

/// Bundle title from a detail page, trying markup before the rendering.
///
/// Markup ladder: `h2.pageheader`, then `<title>` with the storefront
/// suffix removed. Rendering ladder: the `Title:` header line, then the
/// first non-blank line after the `Markdown Content:` marker.
pub fn bundle_name(text: &str) -> Option<String> {
    let doc = Html::parse_document(text);
    html::bundle_name_from_markup(&doc).or_else(|| markdown::bundle_name_from_rendering(text))
}

/// Items listed on a bundle's detail page.
///
/// Structured item anchors win when the markup has any; otherwise the
/// bounded included-items section of the rendering is scanned. Ids are
/// deduplicated within each strategy, first occurrence kept.
pub fn bundle_items(text: &str) -> Vec<BundleItem> {
    let doc = Html::parse_document(text);
    let items = html::items_from_markup(&doc);
    if !items.is_empty() {
        return items;
    }
    markdown::items_from_rendering(text)
}

// ---------------------------------------------------------------------------
// Price parsing
// ---------------------------------------------------------------------------

/// Parse a storefront price into major currency units.
///
/// Strips everything but digits and dots, then decides the scale by
/// separator: a dotted figure is already in major units, a bare digit run
/// is in minor units (`"1999"` is 19.99). Returns `None` for text with no
/// usable figure.
pub fn parse_price(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    let value: f64 = cleaned.parse().ok()?;
    let value = if cleaned.contains('.') {
        value
    } else {
        value / 100.0
    };
    Some((value * 100.0).round() / 100.0)
}

/// Drop the storefront's `" on Steam"` suffix from a page title.
pub(crate) fn strip_site_suffix(title: &str) -> &str {
    title
        .strip_suffix(" on Steam")
        .map(str::trim_end)
        .unwrap_or(title)
}
