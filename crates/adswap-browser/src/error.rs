//! Error types for the adswap-browser crate.

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while driving the browser.
#[derive(Debug, Error)]
pub enum BrowserError {
    /// Failed to establish a WebSocket connection to the DevTools endpoint.
    #[error("failed to connect to DevTools at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    /// The DevTools `/json` endpoint could not be queried or yielded no
    /// attachable page target.
    #[error("target discovery failed: {detail}")]
    Discovery { detail: String },

    /// A CDP command returned an error response.
    #[error("CDP error {code}: {message}")]
    Cdp {
        code: i64,
        message: String,
        data: Option<String>,
    },

    /// A CDP command timed out waiting for a response.
    #[error("CDP command '{method}' timed out after {duration:?}")]
    Timeout { method: String, duration: Duration },

    /// A protocol-level error (serialization, unexpected message format,
    /// dropped connection).
    #[error("CDP protocol error: {detail}")]
    Protocol { detail: String },

    /// Navigation was rejected by the browser (DNS failure, blocked, ...).
    #[error("navigation failed: {reason}")]
    NavigationFailed { reason: String },

    /// The page did not fire its load event within the timeout.
    #[error("page load timed out after {duration:?}")]
    PageLoadTimeout { duration: Duration },

    /// Page-function execution threw a JavaScript exception.
    #[error("JavaScript exception: {message}")]
    JsException { message: String },
}
