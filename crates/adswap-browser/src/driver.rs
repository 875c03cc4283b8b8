//! High-level page driver over the CDP client.
//!
//! [`PageDriver`] exposes the capability surface the replacement engine
//! consumes: navigation with load-event waiting, page-function execution
//! with JSON arguments, scrolling, and viewport/clip screenshots. All
//! methods take `&self`; share the driver behind an `Arc` when the engine's
//! browser and capture backends both need it.

use std::time::Duration;

use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine as _;
use serde_json::Value;

use crate::cdp::CdpClient;
use crate::error::BrowserError;

/// A screenshot clip rectangle in CSS pixels, viewport-relative.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Clip {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Driver for one DevTools page target.
pub struct PageDriver {
    client: CdpClient,
}

impl PageDriver {
    /// Attach to a DevTools page WebSocket and enable the Page and Runtime
    /// domains.
    pub async fn connect(ws_url: &str) -> Result<Self, BrowserError> {
        let client = CdpClient::connect(ws_url).await?;
        client.enable_domains(&["Page", "Runtime"]).await?;
        Ok(Self { client })
    }

    /// Build a driver from an existing client (tests, advanced use).
    pub fn from_client(client: CdpClient) -> Self {
        Self { client }
    }

    /// Start navigating to a URL.
    ///
    /// Browser-side rejections (`errorText` in the response, e.g.
    /// `net::ERR_NAME_NOT_RESOLVED`) surface as
    /// [`BrowserError::NavigationFailed`]. Use [`wait_until_loaded`] to
    /// block until the load event fires.
    ///
    /// [`wait_until_loaded`]: Self::wait_until_loaded
    pub async fn navigate(&self, url: &str) -> Result<(), BrowserError> {
        let result = self
            .client
            .send_command("Page.navigate", build_navigate_params(url))
            .await?;

        if let Some(error_text) = result.get("errorText").and_then(|v| v.as_str()) {
            if !error_text.is_empty() {
                return Err(BrowserError::NavigationFailed {
                    reason: error_text.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Block until `Page.loadEventFired`, up to `timeout`.
    pub async fn wait_until_loaded(&self, timeout: Duration) -> Result<(), BrowserError> {
        self.client
            .wait_for_event("Page.loadEventFired", timeout)
            .await?;
        Ok(())
    }

    /// Navigate and wait for the page load event.
    ///
    /// Buffered events are drained first so a load event left over from an
    /// earlier navigation cannot satisfy this wait.
    pub async fn open(&self, url: &str, timeout: Duration) -> Result<(), BrowserError> {
        self.client.drain_events().await;
        self.navigate(url).await?;
        self.wait_until_loaded(timeout).await
    }

    /// Evaluate a JavaScript expression in the page and return its value.
    ///
    /// Exceptions thrown by the page surface as
    /// [`BrowserError::JsException`].
    pub async fn evaluate(&self, expression: &str) -> Result<Value, BrowserError> {
        let result = self
            .client
            .send_command("Runtime.evaluate", build_evaluate_params(expression))
            .await?;

        if let Some(exception) = result.get("exceptionDetails") {
            let message = exception
                .get("exception")
                .and_then(|e| e.get("description"))
                .and_then(|d| d.as_str())
                .or_else(|| exception.get("text").and_then(|t| t.as_str()))
                .unwrap_or("unknown exception")
                .to_string();
            return Err(BrowserError::JsException { message });
        }

        Ok(result
            .get("result")
            .and_then(|r| r.get("value"))
            .cloned()
            .unwrap_or(Value::Null))
    }

    /// Call a JavaScript function body against the page with JSON arguments.
    ///
    /// `body` must be a function expression
    /// (`"function (a, b) { return a + b; }"`); the arguments are
    /// serde-serialized and applied to it. This is how the engine ships its
    /// scan/mutate/restore scripts with per-call parameters without string
    /// splicing.
    pub async fn call_fn(&self, body: &str, args: &[Value]) -> Result<Value, BrowserError> {
        let expression = build_call_expression(body, args).map_err(|e| BrowserError::Protocol {
            detail: format!("failed to serialize call arguments: {e}"),
        })?;
        self.evaluate(&expression).await
    }

    /// Scroll the window to an absolute document offset.
    pub async fn scroll_to(&self, x: f64, y: f64) -> Result<(), BrowserError> {
        self.call_fn(
            "function (x, y) { window.scrollTo(x, y); return true; }",
            &[Value::from(x), Value::from(y)],
        )
        .await?;
        Ok(())
    }

    /// The current page URL, per `window.location.href`.
    pub async fn current_url(&self) -> Result<String, BrowserError> {
        let value = self.evaluate("window.location.href").await?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| BrowserError::Protocol {
                detail: "location.href did not return a string".to_string(),
            })
    }

    /// Screenshot the current viewport as PNG bytes.
    pub async fn screenshot_viewport(&self) -> Result<Vec<u8>, BrowserError> {
        self.capture(build_screenshot_params(None)).await
    }

    /// Screenshot a clip region of the page as PNG bytes.
    pub async fn screenshot_clip(&self, clip: Clip) -> Result<Vec<u8>, BrowserError> {
        self.capture(build_screenshot_params(Some(clip))).await
    }

    async fn capture(&self, params: Value) -> Result<Vec<u8>, BrowserError> {
        let result = self
            .client
            .send_command("Page.captureScreenshot", params)
            .await?;

        let data_b64 = result
            .get("data")
            .and_then(|d| d.as_str())
            .ok_or_else(|| BrowserError::Protocol {
                detail: "Page.captureScreenshot returned no data".to_string(),
            })?;

        B64.decode(data_b64).map_err(|e| BrowserError::Protocol {
            detail: format!("failed to decode screenshot base64: {e}"),
        })
    }
}

// ---------------------------------------------------------------------------
// CDP parameter builders (free functions so they are testable without a
// browser)
// ---------------------------------------------------------------------------

/// Build `Page.navigate` parameters.
pub fn build_navigate_params(url: &str) -> Value {
    serde_json::json!({ "url": url })
}

/// Build `Runtime.evaluate` parameters.
pub fn build_evaluate_params(expression: &str) -> Value {
    serde_json::json!({
        "expression": expression,
        "returnByValue": true,
        "awaitPromise": true,
    })
}

/// Build the `(fn).apply(null, args)` expression for [`PageDriver::call_fn`].
pub fn build_call_expression(body: &str, args: &[Value]) -> Result<String, serde_json::Error> {
    let args_json = serde_json::to_string(args)?;
    Ok(format!("({body}).apply(null, {args_json})"))
}

/// Build `Page.captureScreenshot` parameters, optionally with a clip region.
pub fn build_screenshot_params(clip: Option<Clip>) -> Value {
    match clip {
        Some(c) => serde_json::json!({
            "format": "png",
            "clip": {
                "x": c.x,
                "y": c.y,
                "width": c.width,
                "height": c.height,
                "scale": 1.0,
            },
        }),
        None => serde_json::json!({ "format": "png" }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn navigate_params_shape() {
        let params = build_navigate_params("https://example.com");
        assert_eq!(params["url"], "https://example.com");
    }

    #[test]
    fn evaluate_params_return_by_value() {
        let params = build_evaluate_params("document.title");
        assert_eq!(params["expression"], "document.title");
        assert_eq!(params["returnByValue"], true);
        assert_eq!(params["awaitPromise"], true);
    }

    #[test]
    fn call_expression_applies_json_args() {
        let expr = build_call_expression(
            "function (a, b) { return a + b; }",
            &[Value::from(2), Value::from(3)],
        )
        .unwrap();
        assert_eq!(expr, "(function (a, b) { return a + b; }).apply(null, [2,3])");
    }

    #[test]
    fn call_expression_escapes_string_args() {
        // String arguments must arrive JSON-escaped, not spliced raw.
        let expr = build_call_expression(
            "function (s) { return s; }",
            &[Value::from("it's \"quoted\"")],
        )
        .unwrap();
        assert!(expr.contains(r#"["it's \"quoted\""]"#));
    }

    #[test]
    fn call_expression_no_args() {
        let expr = build_call_expression("function () { return 1; }", &[]).unwrap();
        assert!(expr.ends_with(".apply(null, [])"));
    }

    #[test]
    fn screenshot_params_viewport() {
        let params = build_screenshot_params(None);
        assert_eq!(params["format"], "png");
        assert!(params.get("clip").is_none());
    }

    #[test]
    fn screenshot_params_clip() {
        let params = build_screenshot_params(Some(Clip {
            x: 20.0,
            y: 120.0,
            width: 300.0,
            height: 250.0,
        }));
        assert_eq!(params["clip"]["x"], 20.0);
        assert_eq!(params["clip"]["y"], 120.0);
        assert_eq!(params["clip"]["width"], 300.0);
        assert_eq!(params["clip"]["height"], 250.0);
        assert_eq!(params["clip"]["scale"], 1.0);
    }

    #[test]
    fn navigate_response_error_text_detected() {
        let response = serde_json::json!({ "errorText": "net::ERR_NAME_NOT_RESOLVED" });
        let error_text = response.get("errorText").and_then(|v| v.as_str());
        assert_eq!(error_text, Some("net::ERR_NAME_NOT_RESOLVED"));
    }

    #[test]
    fn screenshot_response_decodes() {
        let png_magic = vec![0x89, 0x50, 0x4E, 0x47];
        let b64_data = B64.encode(&png_magic);
        let response = serde_json::json!({ "data": b64_data });
        let decoded = B64
            .decode(response["data"].as_str().unwrap())
            .unwrap();
        assert_eq!(decoded, png_magic);
    }
}
