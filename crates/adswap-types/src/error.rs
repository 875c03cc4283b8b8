//! Error taxonomy shared across the adswap crates.

use thiserror::Error;

/// Errors that can occur across an adswap session.
///
/// Only `Setup` and `Config` are fatal: they abort the session before any
/// page is processed. `Navigation` skips a page, `Mutation` skips a surface,
/// and `Capture` is retried once through the native-screenshot fallback
/// before the attempt is recorded as skipped.
#[derive(Debug, Error)]
pub enum SwapError {
    /// Empty creative inventory or unavailable browser capability.
    #[error("setup failed: {0}")]
    Setup(String),

    /// A candidate page failed to load within the configured timeout.
    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    /// A surface failed its pre-mutation dimension re-check, or the mutation
    /// produced no observable change.
    #[error("mutation failed: {reason}")]
    Mutation { reason: String },

    /// The capture gateway failed to produce an image.
    #[error("capture failed: {0}")]
    Capture(String),

    /// Low-level browser/CDP failure surfaced through the page driver.
    #[error("browser error: {0}")]
    Browser(String),

    /// Invalid or unreadable configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

impl SwapError {
    /// Whether this error should abort the whole session.
    pub fn is_fatal(&self) -> bool {
        matches!(self, SwapError::Setup(_) | SwapError::Config(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fatality_split() {
        assert!(SwapError::Setup("no creatives".into()).is_fatal());
        assert!(SwapError::Config("bad toml".into()).is_fatal());
        assert!(!SwapError::Navigation {
            url: "https://example.com".into(),
            reason: "timeout".into()
        }
        .is_fatal());
        assert!(!SwapError::Mutation {
            reason: "dimensions changed".into()
        }
        .is_fatal());
        assert!(!SwapError::Capture("gateway down".into()).is_fatal());
    }

    #[test]
    fn display_carries_context() {
        let err = SwapError::Navigation {
            url: "https://example.com/a".into(),
            reason: "net::ERR_TIMED_OUT".into(),
        };
        let text = err.to_string();
        assert!(text.contains("https://example.com/a"));
        assert!(text.contains("ERR_TIMED_OUT"));
    }
}
