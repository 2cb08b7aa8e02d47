//! Text extraction strategy for sanitized markdown renderings.
//!
//! Reader proxies strip markup down to a line-oriented rendering with a
//! `Title:` header and a `Markdown Content:` body marker. This module
//! works on raw lines with fixed regexes; it also hosts the link scans,
//! which apply to either rendering since they only look at URL paths.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use bundlescout_shared::{BundleId, BundleItem};

/// Bundle detail links, either rendering: `/bundle/{id}`.
static BUNDLE_LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/bundle/(\d+)").expect("valid regex"));

/// Item detail links, either rendering: `/app/{id}`.
static APP_LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/app/(\d+)").expect("valid regex"));

/// Reader-proxy title header line.
static TITLE_LINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^Title:\s*(.+)$").expect("valid regex"));

/// A line that is only a price or discount figure once whitespace is removed.
static PRICE_LINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[-+]?[$€£¥]?\d[\d.,]*[%$€£¥]?$").expect("valid regex"));

/// Numeric character references, decimal or hex.
static NUMERIC_ENTITY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&#(?:x([0-9a-fA-F]+)|([0-9]+));").expect("valid regex"));

/// Reader-proxy marker preceding the converted page body.
const MARKDOWN_CONTENT_MARKER: &str = "Markdown Content:";

/// Start of the included-items section (matched case-insensitively).
const SECTION_START_MARKER: &str = "items included";
/// End of the included-items section (matched case-insensitively).
const SECTION_END_MARKER: &str = "more like this";

/// Purchase boilerplate that must never be taken for an item name.
const PROMO_MARKERS: &[&str] = &[
    "add to cart",
    "add to account",
    "package info",
    "bundle info",
    "view community hub",
];

// ---------------------------------------------------------------------------
// Link scans
// ---------------------------------------------------------------------------

/// Every bundle id linked from the text, in order of appearance.
pub(crate) fn bundle_ids_from_links(text: &str) -> Vec<BundleId> {
    BUNDLE_LINK_RE
        .captures_iter(text)
        .map(|caps| BundleId::new(&caps[1]))
        .collect()
}

// ---------------------------------------------------------------------------
// Bundle name
// ---------------------------------------------------------------------------

/// Bundle title from a markdown rendering: the `Title:` header line first,
/// then the first non-blank line after the `Markdown Content:` marker.
pub(crate) fn bundle_name_from_rendering(text: &str) -> Option<String> {
    for line in text.lines() {
        if let Some(caps) = TITLE_LINE_RE.captures(line.trim()) {
            let decoded = decode_entities(caps[1].trim());
            let name = crate::strip_site_suffix(decoded.trim()).trim();
            if !name.is_empty() {
                return Some(name.to_string());
            }
        }
    }

    let mut lines = text.lines();
    lines.find(|l| l.trim_start().starts_with(MARKDOWN_CONTENT_MARKER))?;
    for line in lines {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let decoded = decode_entities(trimmed.trim_start_matches('#').trim());
        let name = decoded.trim();
        return (!name.is_empty()).then(|| name.to_string());
    }
    None
}

// ---------------------------------------------------------------------------
// Bundle items
// ---------------------------------------------------------------------------

/// Items from the bounded included-items section of a markdown rendering.
///
/// A missing start marker widens the scan to the whole document; a missing
/// end marker runs it to the end. Each `/app/{id}` link contributes one
/// item, deduplicated by id; its display name is the nearest following
/// line that survives [`is_noise_line`].
pub(crate) fn items_from_rendering(text: &str) -> Vec<BundleItem> {
    let lines: Vec<&str> = text.lines().collect();

    let start = lines
        .iter()
        .position(|l| l.to_lowercase().contains(SECTION_START_MARKER))
        .map(|i| i + 1)
        .unwrap_or(0);
    let end = lines[start..]
        .iter()
        .position(|l| l.to_lowercase().contains(SECTION_END_MARKER))
        .map(|i| start + i)
        .unwrap_or(lines.len());

    let mut seen: HashSet<String> = HashSet::new();
    let mut items = Vec::new();

    for i in start..end {
        for caps in APP_LINK_RE.captures_iter(lines[i]) {
            let id = caps[1].to_string();
            if !seen.insert(id.clone()) {
                continue;
            }
            let mut item = BundleItem::with_id(id);
            item.name = display_name_after(&lines, i + 1, end);
            items.push(item);
        }
    }

    items
}

/// Nearest following line usable as a display name.
///
/// Gives up empty-handed if another item link shows up first, so one item
/// can never take the next item's name.
fn display_name_after(lines: &[&str], from: usize, end: usize) -> Option<String> {
    for line in &lines[from..end.min(lines.len())] {
        if APP_LINK_RE.is_match(line) {
            return None;
        }
        if is_noise_line(line) {
            continue;
        }
        let decoded = decode_entities(line.trim());
        let name = decoded.trim();
        if !name.is_empty() {
            return Some(name.to_string());
        }
    }
    None
}

/// Lines that cannot be item names: blanks, markdown structure, prices,
/// and storefront purchase boilerplate.
fn is_noise_line(line: &str) -> bool {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return true;
    }

    // Markdown structure: images, inline links, headings, quotes, rules, bullets.
    if trimmed.starts_with("![") || trimmed.starts_with("[![") {
        return true;
    }
    if trimmed.contains("](") {
        return true;
    }
    if trimmed.starts_with('#') || trimmed.starts_with('>') {
        return true;
    }
    if trimmed.len() >= 3
        && trimmed
            .chars()
            .all(|c| c == '-' || c == '=' || c == '*' || c == '_')
    {
        return true;
    }
    if trimmed.starts_with("- ") || trimmed.starts_with("* ") || trimmed.starts_with("+ ") {
        return true;
    }

    // Price or discount figures.
    let compact: String = trimmed.split_whitespace().collect();
    if PRICE_LINE_RE.is_match(&compact) {
        return true;
    }

    // Purchase boilerplate.
    let lower = trimmed.to_lowercase();
    if lower.starts_with("buy ") || lower.starts_with("save ") {
        return true;
    }
    PROMO_MARKERS.iter().any(|marker| lower.contains(marker))
}

// ---------------------------------------------------------------------------
// Entity decoding
// ---------------------------------------------------------------------------

/// Decode the HTML character references that survive sanitized renderings:
/// the five named ones plus decimal and hex numeric references.
///
/// Numeric references are resolved first and `&amp;` last, so that
/// double-encoded text loses exactly one level of encoding.
pub(crate) fn decode_entities(s: &str) -> String {
    let decoded = NUMERIC_ENTITY_RE.replace_all(s, |caps: &regex::Captures| {
        let code = caps
            .get(1)
            .and_then(|hex| u32::from_str_radix(hex.as_str(), 16).ok())
            .or_else(|| caps.get(2).and_then(|dec| dec.as_str().parse().ok()));
        match code.and_then(char::from_u32) {
            Some(ch) => ch.to_string(),
            None => caps[0].to_string(),
        }
    });

    decoded
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}
