//! End-to-end resolution: subject id → subject page → candidate bundles →
//! detail pages → aggregated bundle list.

use std::collections::{BTreeMap, HashSet};

use tokio::task::JoinSet;
use tracing::{debug, info, instrument};
use url::Url;

use bundlescout_extract as extract;
use bundlescout_fetch::Fetcher;
use bundlescout_shared::{
    Bundle, BundleId, BundleItem, BundlescoutError, ResolveOptions, Result,
};

use crate::limit::Limiter;
use crate::report::{LogLevel, Progress, Reporter};

// ---------------------------------------------------------------------------
// Detail fetch outcome
// ---------------------------------------------------------------------------

/// What one candidate's detail fetch produced.
///
/// Only the orchestrator talks to the reporter, so tasks hand back data
/// instead of reporting from inside the spawn.
enum DetailOutcome {
    /// Page fetched and a named bundle parsed out of it.
    Resolved { bundle: Bundle, body: String },
    /// Page fetched but neither format yielded a name.
    Nameless { url: String },
    /// Every fetch candidate for the page failed.
    Failed(String),
}

/// Fetch one bundle's detail page and parse it.
async fn fetch_detail(fetcher: &Fetcher, bundle_id: &BundleId, detail_url: &str) -> DetailOutcome {
    let resource = format!("bundle page {bundle_id}");
    let page = match fetcher.fetch_text(detail_url, &resource).await {
        Ok(page) => page,
        Err(e) => return DetailOutcome::Failed(e.to_string()),
    };
    debug!(%bundle_id, url = %page.url, "detail page fetched");

    match extract::bundle_name(&page.body) {
        Some(name) => DetailOutcome::Resolved {
            bundle: Bundle {
                id: bundle_id.clone(),
                name,
                items: extract::bundle_items(&page.body),
            },
            body: page.body,
        },
        None => DetailOutcome::Nameless { url: page.url },
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Resolve every commercial bundle that includes the given subject item.
///
/// 1. Fetch the subject's page and scan it for candidate bundle ids
/// 2. Fetch each candidate's detail page under the concurrency cap
/// 3. Aggregate named bundles in discovery order
///
/// The subject page is load-bearing, so its failure is the caller's error;
/// individual detail failures are reported and skipped. Membership widgets
/// on the subject page seed name-only records that a successful detail
/// fetch replaces and a failed one leaves standing.
#[instrument(skip_all, fields(subject = %subject_id))]
pub async fn resolve_bundles(
    subject_id: &str,
    opts: &ResolveOptions,
    reporter: &dyn Reporter,
) -> Result<Vec<Bundle>> {
    let subject_id = subject_id.trim();
    if subject_id.is_empty() {
        return Err(BundlescoutError::invalid_input(
            "subject id must not be blank",
        ));
    }

    let list_url = opts.storefront.subject_page_url(subject_id);
    Url::parse(&list_url).map_err(|e| {
        BundlescoutError::config(format!("invalid storefront URL {list_url}: {e}"))
    })?;

    // --- Phase 1: Subject page ---
    reporter.log(
        LogLevel::Info,
        &format!("Resolving bundles for app {subject_id}"),
    );
    reporter.progress(&Progress {
        current: 0,
        total: 1,
        message: "Fetching subject page".into(),
    });

    let fetcher = Fetcher::new(&opts.proxy, opts.timeout_secs, opts.max_redirects)?;
    let page = fetcher
        .fetch_text(&list_url, &format!("subject page {subject_id}"))
        .await?;
    reporter.log(
        LogLevel::Success,
        &format!("Fetched subject page via {}", page.url),
    );
    reporter.detail("Subject page", &page.body);

    // --- Phase 2: Candidate discovery ---
    let mut candidates = extract::candidate_bundle_ids(&page.body)?;
    let seeds = extract::bundles_for_subject(&page.body, subject_id);
    for seed in &seeds {
        if !candidates.contains(&seed.id) {
            candidates.push(seed.id.clone());
        }
    }
    info!(
        candidates = candidates.len(),
        seeds = seeds.len(),
        "subject page scanned"
    );

    if candidates.is_empty() {
        reporter.log(
            LogLevel::Warning,
            &format!("No bundles reference app {subject_id}"),
        );
        reporter.progress(&Progress {
            current: 1,
            total: 1,
            message: "Done".into(),
        });
        reporter.bundles(&[], true);
        return Ok(Vec::new());
    }

    let total = candidates.len() + 1;
    reporter.progress(&Progress {
        current: 1,
        total,
        message: format!("Found {} candidate bundles", candidates.len()),
    });

    // Keyed by discovery index so snapshots come out in discovery order.
    let mut resolved: BTreeMap<usize, Bundle> = BTreeMap::new();
    for seed in seeds {
        if let Some(idx) = candidates.iter().position(|id| *id == seed.id) {
            resolved.insert(idx, seed);
        }
    }
    if !resolved.is_empty() {
        reporter.bundles(&snapshot(&resolved), false);
    }

    // --- Phase 3: Detail pages ---
    let limiter = Limiter::new(opts.concurrency);
    let mut tasks: JoinSet<(usize, BundleId, DetailOutcome)> = JoinSet::new();

    for (idx, bundle_id) in candidates.iter().enumerate() {
        let bundle_id = bundle_id.clone();
        let detail_url = opts.storefront.bundle_page_url(&bundle_id);
        let fetcher = fetcher.clone();
        let limiter = limiter.clone();

        tasks.spawn(async move {
            let outcome = limiter.run(fetch_detail(&fetcher, &bundle_id, &detail_url)).await;
            (idx, bundle_id, outcome)
        });
    }

    let mut current = 1usize;
    while let Some(joined) = tasks.join_next().await {
        current += 1;
        match joined {
            Ok((idx, bundle_id, outcome)) => match outcome {
                DetailOutcome::Resolved { mut bundle, body } => {
                    bundle.items = sanitize_items(bundle.items, subject_id);
                    reporter.log(
                        LogLevel::Success,
                        &format!("Resolved bundle {bundle_id}: {}", bundle.name),
                    );
                    reporter.detail(&format!("Bundle {bundle_id} page"), &body);
                    resolved.insert(idx, bundle);
                    reporter.bundles(&snapshot(&resolved), false);
                }
                DetailOutcome::Nameless { url } => {
                    reporter.log(
                        LogLevel::Warning,
                        &format!("Bundle {bundle_id} page at {url} had no usable name"),
                    );
                }
                DetailOutcome::Failed(error) => {
                    reporter.log(
                        LogLevel::Error,
                        &format!("Bundle {bundle_id} failed: {error}"),
                    );
                }
            },
            Err(join_err) => {
                reporter.log(LogLevel::Error, &format!("Bundle task failed: {join_err}"));
            }
        }
        reporter.progress(&Progress {
            current,
            total,
            message: "Fetching bundle pages".into(),
        });
    }

    // --- Phase 4: Aggregate ---
    let bundles = snapshot(&resolved);
    info!(resolved = bundles.len(), "bundle resolution completed");
    reporter.log(
        LogLevel::Success,
        &format!("Resolved {} bundle(s) for app {subject_id}", bundles.len()),
    );
    reporter.progress(&Progress {
        current: total,
        total,
        message: "Done".into(),
    });
    reporter.bundles(&bundles, true);

    Ok(bundles)
}

/// Bundles resolved so far, in discovery order, blank names dropped.
fn snapshot(resolved: &BTreeMap<usize, Bundle>) -> Vec<Bundle> {
    resolved
        .values()
        .filter(|b| !b.name.trim().is_empty())
        .cloned()
        .collect()
}

/// Drop the subject itself and repeated ids from a bundle's item list.
fn sanitize_items(items: Vec<BundleItem>, subject_id: &str) -> Vec<BundleItem> {
    let mut seen: HashSet<String> = HashSet::new();
    items
        .into_iter()
        .filter(|item| item.id != subject_id && seen.insert(item.id.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    enum Event {
        Log(LogLevel, String),
        Detail(String),
        Progress(usize, usize),
        Bundles(usize, bool),
    }

    #[derive(Default)]
    struct RecordingReporter {
        events: std::sync::Mutex<Vec<Event>>,
    }

    impl Reporter for RecordingReporter {
        fn log(&self, level: LogLevel, message: &str) {
            self.events
                .lock()
                .unwrap()
                .push(Event::Log(level, message.to_string()));
        }
        fn detail(&self, title: &str, _body: &str) {
            self.events.lock().unwrap().push(Event::Detail(title.to_string()));
        }
        fn progress(&self, progress: &Progress) {
            self.events
                .lock()
                .unwrap()
                .push(Event::Progress(progress.current, progress.total));
        }
        fn bundles(&self, bundles: &[Bundle], is_final: bool) {
            self.events
                .lock()
                .unwrap()
                .push(Event::Bundles(bundles.len(), is_final));
        }
    }

    fn test_options(server: &wiremock::MockServer) -> ResolveOptions {
        let mut opts = ResolveOptions::default();
        opts.storefront.base_url = server.uri();
        opts.proxy.enabled = false;
        opts.concurrency = 2;
        opts
    }

    const SUBJECT_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>Portal 2 on Steam</title></head>
<body>
  <div data-ds-bundleids="[8216]"></div>
  <div data-ds-bundleid="8216"
       data-ds-bundle-data='{"m_rgItems":[{"m_rgIncludedAppIDs":[620,400]}]}'>
    <h1>Buy Portal Bundle</h1>
  </div>
  <a href="/bundle/4167/Valve_Complete/">Valve Complete Pack</a>
</body>
</html>"#;

    const BUNDLE_8216: &str = r#"<html>
<head><title>Portal Bundle on Steam</title></head>
<body>
  <h2 class="pageheader">Portal Bundle</h2>
  <a href="/app/400/" data-ds-appid="400" data-ds-itemname="Portal"
     data-price-final="999"></a>
  <a href="/app/620/" data-ds-appid="620" data-ds-itemname="Portal 2"></a>
</body>
</html>"#;

    #[tokio::test]
    async fn test_resolves_bundles_end_to_end() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/app/620/"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_string(SUBJECT_PAGE))
            .mount(&server)
            .await;

        wiremock::Mock::given(wiremock::matchers::path("/bundle/8216/"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_string(BUNDLE_8216))
            .mount(&server)
            .await;

        wiremock::Mock::given(wiremock::matchers::path("/bundle/4167/"))
            .respond_with(wiremock::ResponseTemplate::new(500).set_body_string("down"))
            .mount(&server)
            .await;

        let reporter = RecordingReporter::default();
        let bundles = resolve_bundles("620", &test_options(&server), &reporter)
            .await
            .unwrap();

        assert_eq!(bundles.len(), 1);
        assert_eq!(bundles[0].id, BundleId::new("8216"));
        assert_eq!(bundles[0].name, "Portal Bundle");
        assert_eq!(bundles[0].items.len(), 1);
        assert_eq!(bundles[0].items[0].id, "400");
        assert_eq!(bundles[0].items[0].price, Some(9.99));

        let events = reporter.events.lock().unwrap();

        // The dead candidate shows up as an error log naming its id.
        assert!(events.iter().any(|e| matches!(
            e,
            Event::Log(LogLevel::Error, msg) if msg.contains("4167")
        )));

        // Progress starts before the subject fetch, ends complete, and
        // never goes backward.
        let progress: Vec<(usize, usize)> = events
            .iter()
            .filter_map(|e| match e {
                Event::Progress(c, t) => Some((*c, *t)),
                _ => None,
            })
            .collect();
        assert_eq!(progress.first(), Some(&(0, 1)));
        assert_eq!(progress.last(), Some(&(3, 3)));
        assert!(progress.windows(2).all(|w| w[0].0 <= w[1].0));

        // The membership seed produced an interim snapshot before any
        // detail page landed; exactly one snapshot is final.
        assert!(events
            .iter()
            .any(|e| matches!(e, Event::Bundles(1, false))));
        assert_eq!(
            events
                .iter()
                .filter(|e| matches!(e, Event::Bundles(_, true)))
                .count(),
            1
        );

        // Both fetched pages were surfaced as detail blocks.
        assert!(events
            .iter()
            .any(|e| matches!(e, Event::Detail(t) if t == "Subject page")));
        assert!(events
            .iter()
            .any(|e| matches!(e, Event::Detail(t) if t.contains("8216"))));
    }

    #[tokio::test]
    async fn test_zero_candidates_short_circuits() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::path("/app/620/"))
            .respond_with(
                wiremock::ResponseTemplate::new(200)
                    .set_body_string("<html><body><p>Nothing for sale.</p></body></html>"),
            )
            .mount(&server)
            .await;

        let reporter = RecordingReporter::default();
        let bundles = resolve_bundles("620", &test_options(&server), &reporter)
            .await
            .unwrap();
        assert!(bundles.is_empty());

        let events = reporter.events.lock().unwrap();
        assert!(events
            .iter()
            .any(|e| matches!(e, Event::Log(LogLevel::Warning, _))));
        assert!(events.iter().any(|e| matches!(e, Event::Progress(1, 1))));
        assert!(events.iter().any(|e| matches!(e, Event::Bundles(0, true))));
    }

    #[tokio::test]
    async fn test_nameless_detail_keeps_membership_seed() {
        let server = wiremock::MockServer::start().await;

        let subject_page = r#"<html><body>
          <div data-ds-bundleids="[8216]"></div>
          <div data-ds-bundleid="8216"
               data-ds-bundle-data='{"m_rgItems":[{"m_rgIncludedAppIDs":[620]}]}'>
            <h1>Buy Portal Bundle</h1>
          </div>
        </body></html>"#;

        wiremock::Mock::given(wiremock::matchers::path("/app/620/"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_string(subject_page))
            .mount(&server)
            .await;

        wiremock::Mock::given(wiremock::matchers::path("/bundle/8216/"))
            .respond_with(
                wiremock::ResponseTemplate::new(200)
                    .set_body_string("plain text with nothing useful"),
            )
            .mount(&server)
            .await;

        let reporter = RecordingReporter::default();
        let bundles = resolve_bundles("620", &test_options(&server), &reporter)
            .await
            .unwrap();

        assert_eq!(bundles.len(), 1);
        assert_eq!(bundles[0].name, "Portal Bundle");
        assert!(bundles[0].items.is_empty());

        let events = reporter.events.lock().unwrap();
        assert!(events.iter().any(|e| matches!(
            e,
            Event::Log(LogLevel::Warning, msg) if msg.contains("8216")
        )));
    }

    #[tokio::test]
    async fn test_blank_subject_is_invalid_input() {
        let reporter = RecordingReporter::default();
        let err = resolve_bundles("   ", &ResolveOptions::default(), &reporter)
            .await
            .unwrap_err();
        assert!(matches!(err, BundlescoutError::InvalidInput { .. }));
    }

    #[test]
    fn sanitize_drops_subject_and_duplicates() {
        let items = vec![
            BundleItem::with_id("400"),
            BundleItem::with_id("620"),
            BundleItem::with_id("400"),
            BundleItem::with_id("546560"),
        ];
        let kept = sanitize_items(items, "620");
        let ids: Vec<&str> = kept.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["400", "546560"]);
    }
}
