//! Storefront page fetching with ordered proxy fallback.
//!
//! The storefront drops or blocks enough requests that one attempt per page
//! is not dependable. For every page the fetcher builds an ordered list of
//! candidate URLs: the canonical storefront URL first, then each configured
//! proxy prefix applied to it. Candidates are tried strictly in order, one
//! attempt each; the first success wins, every miss is recorded, and an
//! exhausted list surfaces the whole attempt trail in the error.

use reqwest::Client;
use tracing::{debug, instrument, warn};

use bundlescout_shared::{BundlescoutError, FetchAttempt, ProxyConfig, Result};

/// User-Agent string for storefront requests.
const USER_AGENT: &str = concat!("bundlescout/", env!("CARGO_PKG_VERSION"));

/// Longest error body excerpt kept in an attempt record.
const SNIPPET_MAX_LEN: usize = 200;

// ---------------------------------------------------------------------------
// Fetched page
// ---------------------------------------------------------------------------

/// One successfully fetched page.
#[derive(Debug, Clone)]
pub struct FetchedText {
    /// The candidate URL that answered.
    pub url: String,
    /// Response body as text.
    pub body: String,
}

// ---------------------------------------------------------------------------
// Fetcher
// ---------------------------------------------------------------------------

/// HTTP client with a fixed proxy fallback chain.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    prefixes: Vec<String>,
}

impl Fetcher {
    /// Build a fetcher from proxy settings and HTTP limits.
    pub fn new(proxy: &ProxyConfig, timeout_secs: u64, max_redirects: u32) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(max_redirects as usize))
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| {
                BundlescoutError::Network(format!("failed to build HTTP client: {e}"))
            })?;

        Ok(Self {
            client,
            prefixes: proxy_prefixes(proxy),
        })
    }

    /// Candidate URLs for one page, in the order they will be tried.
    pub fn candidate_urls(&self, canonical: &str) -> Vec<String> {
        let mut candidates = Vec::with_capacity(self.prefixes.len() + 1);
        candidates.push(canonical.to_string());
        for prefix in &self.prefixes {
            let candidate = format!("{prefix}{canonical}");
            if !candidates.contains(&candidate) {
                candidates.push(candidate);
            }
        }
        candidates
    }

    /// Fetch one page, walking the candidate list in order.
    ///
    /// `resource` names the page in the error when every candidate fails.
    #[instrument(skip_all, fields(resource = %resource))]
    pub async fn fetch_text(&self, canonical: &str, resource: &str) -> Result<FetchedText> {
        let mut attempts: Vec<FetchAttempt> = Vec::new();

        for url in self.candidate_urls(canonical) {
            match self.try_candidate(&url).await {
                Ok(body) => {
                    debug!(%url, bytes = body.len(), "fetch candidate answered");
                    return Ok(FetchedText { url, body });
                }
                Err(error) => {
                    warn!(%url, %error, "fetch candidate failed");
                    attempts.push(FetchAttempt { url, error });
                }
            }
        }

        Err(BundlescoutError::Unavailable {
            resource: resource.to_string(),
            attempts,
        })
    }

    /// Try a single candidate, returning its body or a one-line error.
    async fn try_candidate(&self, url: &str) -> std::result::Result<String, String> {
        let response = self.client.get(url).send().await.map_err(|e| e.to_string())?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| format!("body read failed: {e}"))?;

        if !status.is_success() {
            let excerpt = snippet(&body);
            return Err(if excerpt.is_empty() {
                format!("HTTP {status}")
            } else {
                format!("HTTP {status}: {excerpt}")
            });
        }
        Ok(body)
    }
}

/// Proxy prefixes in fallback order: the primary override first, then the
/// built-in fallbacks, duplicates dropped.
fn proxy_prefixes(proxy: &ProxyConfig) -> Vec<String> {
    if !proxy.enabled {
        return Vec::new();
    }
    let mut prefixes: Vec<String> = Vec::new();
    if let Some(primary) = proxy.primary_prefix() {
        prefixes.push(primary);
    }
    for fallback in &proxy.fallbacks {
        if !prefixes.contains(fallback) {
            prefixes.push(fallback.clone());
        }
    }
    prefixes
}

/// Single-line excerpt of an error body for the attempt trail.
fn snippet(body: &str) -> String {
    let flat = body.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() > SNIPPET_MAX_LEN {
        let mut cut: String = flat.chars().take(SNIPPET_MAX_LEN).collect();
        cut.push_str("...");
        return cut;
    }
    flat
}
