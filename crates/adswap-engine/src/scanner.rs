//! Page-side surface scanning.
//!
//! The scan script walks every visible element of the rendered page and
//! returns those whose bounding box equals the target dimensions exactly
//! (zero tolerance — ad slots are fixed-size by contract). Matched nodes
//! are parked in a `window`-scoped arena (`window.__adswapScan`) tagged
//! with a monotonically increasing epoch; the Rust side only ever holds
//! [`SurfaceHandle`]s — epoch plus index — never element references.
//! Navigation wipes `window`, invalidating every outstanding handle
//! wholesale, and the mutation/restore scripts reject handles whose epoch
//! no longer matches the arena.
//!
//! Scanning is a pure read: it registers nodes and reports geometry and
//! attributes, but never touches the DOM.

use serde::Deserialize;
use serde_json::Value;

use adswap_types::{Dimension, SwapError};

/// Index into one scan's arena, valid only while that scan's epoch is
/// current and the page has not navigated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SurfaceHandle {
    pub epoch: u64,
    pub index: u32,
}

/// Content kind of a matched surface, dispatched exhaustively when
/// selecting the mutation/restore script pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SurfaceKind {
    /// The element is (or contains) a content image; mutation swaps the
    /// image source.
    Image,
    /// The element is (or contains) an embedded frame; mutation hides the
    /// frame and overlays an image across its box.
    Frame,
    /// Everything else; mutation rewrites the background image.
    Background,
}

/// Raw per-element output of one scan, before ad-likeness judgment.
#[derive(Debug, Clone, Deserialize)]
pub struct SurfaceDescriptor {
    pub index: u32,
    pub width: u32,
    pub height: u32,
    /// Document-relative top, CSS pixels.
    pub top: f64,
    /// Document-relative left, CSS pixels.
    pub left: f64,
    pub tag: String,
    #[serde(rename = "className")]
    pub class_name: String,
    pub id: String,
    pub src: String,
    /// Whether the element carries a non-empty background image.
    pub background: bool,
    pub kind: SurfaceKind,
}

/// One scan's worth of descriptors plus the arena epoch they live under.
#[derive(Debug, Clone, Deserialize)]
pub struct ScanResult {
    pub epoch: u64,
    pub surfaces: Vec<SurfaceDescriptor>,
}

/// A matcher-approved surface, ready for the mutation pipeline.
#[derive(Debug, Clone)]
pub struct Surface {
    pub handle: SurfaceHandle,
    pub dimension: Dimension,
    pub top: f64,
    pub left: f64,
    pub kind: SurfaceKind,
}

impl Surface {
    /// Page-scoped dedup key: document position with rounded coordinates.
    pub fn position_key(&self) -> String {
        position_key(self.top, self.left)
    }
}

/// Format the `(top, left)` dedup key shared by surfaces and records.
pub fn position_key(top: f64, left: f64) -> String {
    format!("top:{},left:{}", top.round() as i64, left.round() as i64)
}

/// Scan function shipped to the page via
/// [`PageDriver::call_fn`](adswap_browser::PageDriver::call_fn).
/// Arguments: `(targetWidth, targetHeight)`.
pub const SCAN_SURFACES_FN: &str = r#"function (w, h) {
    var prior = window.__adswapScan;
    var epoch = (prior && prior.epoch ? prior.epoch : 0) + 1;
    var nodes = [];
    var surfaces = [];
    if (!document.body) {
        window.__adswapScan = { epoch: epoch, nodes: nodes };
        return { epoch: epoch, surfaces: surfaces };
    }
    var walker = document.createTreeWalker(
        document.body,
        NodeFilter.SHOW_ELEMENT,
        {
            acceptNode: function (node) {
                var style = window.getComputedStyle(node);
                if (style.display === 'none' ||
                    style.visibility === 'hidden' ||
                    style.opacity === '0') {
                    return NodeFilter.FILTER_REJECT;
                }
                return NodeFilter.FILTER_ACCEPT;
            }
        }
    );
    var node;
    while ((node = walker.nextNode())) {
        var rect = node.getBoundingClientRect();
        if (rect.width <= 0 || rect.height <= 0) continue;
        if (Math.round(rect.width) !== w || Math.round(rect.height) !== h) continue;
        var style = window.getComputedStyle(node);
        var tag = node.tagName.toLowerCase();
        var kind = 'background';
        if (tag === 'img' || node.querySelector('img')) {
            kind = 'image';
        } else if (tag === 'iframe' || node.querySelector('iframe')) {
            kind = 'frame';
        }
        surfaces.push({
            index: nodes.length,
            width: Math.round(rect.width),
            height: Math.round(rect.height),
            top: rect.top + window.pageYOffset,
            left: rect.left + window.pageXOffset,
            tag: tag,
            className: typeof node.className === 'string' ? node.className : '',
            id: node.id || '',
            src: node.src || '',
            background: !!(style.backgroundImage && style.backgroundImage !== 'none'),
            kind: kind
        });
        nodes.push(node);
    }
    window.__adswapScan = { epoch: epoch, nodes: nodes };
    return { epoch: epoch, surfaces: surfaces };
}"#;

/// Parse the scan script's return value.
pub fn parse_scan_result(value: Value) -> Result<ScanResult, SwapError> {
    serde_json::from_value(value)
        .map_err(|e| SwapError::Browser(format!("unparsable scan result: {e}")))
}
