//! Candidate-page collection — the external supplier feeding the
//! orchestrator.
//!
//! Opens the base page, harvests anchor hrefs, and keeps same-host links
//! in document order, deduplicated and truncated to the configured count.
//! A base page that will not load yields an empty sequence: the session
//! then completes normally with zero captures rather than failing setup.

use tracing::warn;
use url::Url;

use adswap_browser::PageDriver;
use adswap_types::AdSwapConfig;

const COLLECT_LINKS_FN: &str = r#"function () {
    var anchors = document.querySelectorAll('a[href]');
    var hrefs = [];
    for (var i = 0; i < anchors.length; i++) {
        hrefs.push(anchors[i].href);
    }
    return hrefs;
}"#;

/// Collect candidate article pages from the configured base URL.
pub async fn collect_candidates(driver: &PageDriver, config: &AdSwapConfig) -> Vec<String> {
    if let Err(e) = driver.open(&config.base_url, config.page_timeout()).await {
        warn!(url = %config.base_url, error = %e, "base page did not load; no candidates");
        return Vec::new();
    }
    let hrefs = match driver.call_fn(COLLECT_LINKS_FN, &[]).await {
        Ok(value) => serde_json::from_value::<Vec<String>>(value).unwrap_or_default(),
        Err(e) => {
            warn!(error = %e, "link collection failed");
            return Vec::new();
        }
    };
    filter_candidates(&config.base_url, hrefs, config.article_count as usize)
}

/// Same-host filter, order-preserving dedup, truncation.
///
/// `www.`-prefix differences are ignored when comparing hosts; the base
/// page itself is excluded.
pub fn filter_candidates(base_url: &str, hrefs: Vec<String>, limit: usize) -> Vec<String> {
    let Some(base) = Url::parse(base_url).ok() else {
        return Vec::new();
    };
    let base_host = match base.host_str() {
        Some(host) => host.trim_start_matches("www.").to_string(),
        None => return Vec::new(),
    };

    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for href in hrefs {
        if out.len() >= limit {
            break;
        }
        let Ok(parsed) = Url::parse(&href) else {
            continue;
        };
        if !matches!(parsed.scheme(), "http" | "https") {
            continue;
        }
        let Some(host) = parsed.host_str() else {
            continue;
        };
        if host.trim_start_matches("www.") != base_host {
            continue;
        }
        if parsed == base {
            continue;
        }
        if seen.insert(href.clone()) {
            out.push(href);
        }
    }
    out
}
