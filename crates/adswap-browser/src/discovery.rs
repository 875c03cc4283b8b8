//! DevTools target discovery over the `/json` HTTP endpoint.
//!
//! Chrome started with `--remote-debugging-port` serves a JSON list of
//! attachable targets at `http://host:port/json`. [`list_targets`] fetches
//! it and [`pick_page_target`] selects the page the driver should attach
//! to: the first real `page` target, preferring ones already showing an
//! http(s) URL over browser-internal pages.

use serde::Deserialize;

use crate::error::BrowserError;

/// One entry of the DevTools `/json` target list.
#[derive(Debug, Clone, Deserialize)]
pub struct DevToolsTarget {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(rename = "webSocketDebuggerUrl")]
    pub ws_url: Option<String>,
}

impl DevToolsTarget {
    fn is_attachable_page(&self) -> bool {
        self.kind == "page" && self.ws_url.is_some()
    }

    fn has_web_url(&self) -> bool {
        self.url.starts_with("http://") || self.url.starts_with("https://")
    }
}

/// Fetch the target list from a DevTools endpoint
/// (e.g. `http://127.0.0.1:9222`).
pub async fn list_targets(devtools_url: &str) -> Result<Vec<DevToolsTarget>, BrowserError> {
    let endpoint = format!("{}/json", devtools_url.trim_end_matches('/'));
    let response = reqwest::get(&endpoint)
        .await
        .map_err(|e| BrowserError::Discovery {
            detail: format!("GET {endpoint}: {e}"),
        })?;

    response
        .json::<Vec<DevToolsTarget>>()
        .await
        .map_err(|e| BrowserError::Discovery {
            detail: format!("unparsable target list from {endpoint}: {e}"),
        })
}

/// Pick the page target to attach to.
///
/// Prefers page targets already showing a web URL (so attaching to a fresh
/// browser with only `chrome://newtab` still works as a fallback); returns
/// `None` when no attachable page target exists.
pub fn pick_page_target(targets: &[DevToolsTarget]) -> Option<&DevToolsTarget> {
    targets
        .iter()
        .find(|t| t.is_attachable_page() && t.has_web_url())
        .or_else(|| targets.iter().find(|t| t.is_attachable_page()))
}
