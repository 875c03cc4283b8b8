//! Ad-likeness judgment over scanner output.
//!
//! A surface is accepted as ad-like when ANY of the following holds:
//!
//! 1. its class, id, or source contains a configured ad keyword;
//! 2. its element kind is image, embedded frame, or generic container;
//! 3. it carries a non-empty background image.
//!
//! This is a deliberately permissive disjunction: high recall, tolerant of
//! false positives. Every mutation performed downstream is verified and
//! fully reversible, so a same-dimension content image slipping through
//! costs one capture, not page integrity. Keep it permissive.

use crate::scanner::{ScanResult, Surface, SurfaceDescriptor, SurfaceHandle};
use adswap_types::Dimension;

/// Element tags counted as ad-capable containers on their own.
const AD_CAPABLE_TAGS: [&str; 3] = ["img", "iframe", "div"];

/// Whether a scanned element looks like an advertisement slot.
pub fn is_ad_like(descriptor: &SurfaceDescriptor, keywords: &[String]) -> bool {
    let class_lower = descriptor.class_name.to_lowercase();
    let id_lower = descriptor.id.to_lowercase();
    let src_lower = descriptor.src.to_lowercase();
    let has_keyword = keywords.iter().any(|k| {
        let k = k.to_lowercase();
        class_lower.contains(&k) || id_lower.contains(&k) || src_lower.contains(&k)
    });

    has_keyword
        || AD_CAPABLE_TAGS.contains(&descriptor.tag.as_str())
        || descriptor.background
}

/// Filter a scan down to the ad-like surfaces, in scan-return order.
pub fn match_surfaces(scan: &ScanResult, keywords: &[String]) -> Vec<Surface> {
    scan.surfaces
        .iter()
        .filter(|d| is_ad_like(d, keywords))
        .map(|d| Surface {
            handle: SurfaceHandle {
                epoch: scan.epoch,
                index: d.index,
            },
            dimension: Dimension::new(d.width, d.height),
            top: d.top,
            left: d.left,
            kind: d.kind,
        })
        .collect()
}
