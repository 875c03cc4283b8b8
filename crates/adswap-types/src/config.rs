//! Configuration for an adswap session.
//!
//! [`AdSwapConfig`] is loaded from `adswap.toml` and controls the session
//! target, candidate-page collection, creative inventory location, the
//! ad-dimension table, per-dimension usage caps, overlay button styling,
//! and the timing knobs of the replacement loop.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::SwapError;
use crate::geom::Dimension;

/// Default config filename looked up in the working directory.
pub const CONFIG_FILENAME: &str = "adswap.toml";

/// Style of the close/info buttons injected next to a substituted creative.
///
/// `Branded*` variants use the ad-network AdChoices badge for the info
/// button; `Plain*` variants use a neutral inline SVG. `None` suppresses
/// button injection entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ButtonStyle {
    PlainCross,
    #[default]
    PlainDots,
    BrandedCross,
    BrandedDots,
    None,
}

/// Top-level configuration for one adswap session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdSwapConfig {
    /// Stop the session once this many captures have been taken.
    pub target_captures: u32,
    /// Page whose same-host links seed the candidate-page list.
    pub base_url: String,
    /// How many candidate pages to collect from the base page.
    pub article_count: u32,
    /// Folder holding replacement creatives (`img_300x250.jpg`, ...).
    pub creative_folder: PathBuf,
    /// Folder screenshots are written into.
    pub screenshot_folder: PathBuf,
    /// Ad-slot dimensions worth scanning for.
    pub ad_sizes: Vec<Dimension>,
    /// Per-dimension usage caps, keyed `"WxH"`. Missing key = uncapped.
    pub usage_caps: HashMap<String, u32>,
    /// Overlay button styling injected with each substitution.
    pub button_style: ButtonStyle,
    /// Substrings of class/id/src that mark an element ad-like.
    pub ad_keywords: Vec<String>,
    /// Page-load timeout in seconds; pages exceeding it are skipped.
    pub page_timeout_secs: u64,
    /// Settle delay between navigation, scroll, and capture steps.
    pub settle_secs: u64,
    /// Abort the session after this many consecutive zero-capture pages.
    pub max_consecutive_failures: u32,
    /// DevTools HTTP endpoint of the browser to attach to.
    pub devtools_url: String,
    /// Optional path for the JSON session report.
    pub report_path: Option<PathBuf>,
    /// Verbose per-element scan logging.
    pub debug: bool,
}

impl Default for AdSwapConfig {
    fn default() -> Self {
        Self {
            target_captures: 10,
            base_url: String::new(),
            article_count: 20,
            creative_folder: PathBuf::from("data/replace_image"),
            screenshot_folder: PathBuf::from("data/screenshots"),
            ad_sizes: default_ad_sizes(),
            usage_caps: HashMap::new(),
            button_style: ButtonStyle::default(),
            ad_keywords: default_ad_keywords(),
            page_timeout_secs: 15,
            settle_secs: 3,
            max_consecutive_failures: 3,
            devtools_url: "http://127.0.0.1:9222".to_string(),
            report_path: None,
            debug: false,
        }
    }
}

impl AdSwapConfig {
    /// Parse a configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, SwapError> {
        toml::from_str(content).map_err(|e| SwapError::Config(e.to_string()))
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml(&self) -> Result<String, SwapError> {
        toml::to_string_pretty(self).map_err(|e| SwapError::Config(e.to_string()))
    }

    /// Page-load timeout as a [`Duration`].
    pub fn page_timeout(&self) -> Duration {
        Duration::from_secs(self.page_timeout_secs)
    }

    /// Inter-step settle delay as a [`Duration`].
    pub fn settle(&self) -> Duration {
        Duration::from_secs(self.settle_secs)
    }

    /// The usage-cap table with its `"WxH"` keys parsed.
    ///
    /// Keys that fail to parse are dropped; the caller has no dimension to
    /// apply them to.
    pub fn parsed_usage_caps(&self) -> HashMap<Dimension, u32> {
        self.usage_caps
            .iter()
            .filter_map(|(k, v)| k.parse::<Dimension>().ok().map(|d| (d, *v)))
            .collect()
    }
}

/// The standard display-ad dimension table.
fn default_ad_sizes() -> Vec<Dimension> {
    [
        (970, 90),
        (986, 106),
        (728, 90),
        (300, 250),
        (336, 280),
        (320, 50),
        (160, 600),
        (300, 600),
        (120, 600),
        (240, 400),
        (250, 250),
        (300, 50),
        (320, 100),
        (980, 120),
    ]
    .into_iter()
    .map(|(w, h)| Dimension::new(w, h))
    .collect()
}

fn default_ad_keywords() -> Vec<String> {
    ["ad", "advertisement", "banner", "google", "ads", "ad-", "-ad"]
        .into_iter()
        .map(str::to_string)
        .collect()
}
