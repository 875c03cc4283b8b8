//! Capture gateway and screenshot persistence.
//!
//! [`CaptureGateway`] is the single isolation point for screenshot
//! mechanics: the orchestrator asks for a region or the viewport and gets
//! pixel bytes back. The backend is selected once at startup; the shipped
//! backend is [`CdpCapture`], which clips the page screenshot to the
//! surface box. Gateway failure triggers exactly one fallback — the
//! browser's native viewport screenshot — sequenced by the orchestrator,
//! not here.
//!
//! [`ScreenshotStore`] writes capture bytes under timestamped names in the
//! configured folder.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use adswap_browser::PageDriver;
use adswap_types::{Region, SwapError};

use crate::browse::clip_of;

/// Errors from a capture backend.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("capture backend failed: {0}")]
    Backend(String),
}

/// What to capture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CaptureRegion {
    /// The full visible viewport.
    Viewport,
    /// A viewport-relative rectangle.
    Region(Region),
}

/// Produces pixel screenshots of a region or the viewport.
#[async_trait]
pub trait CaptureGateway: Send {
    async fn capture(&mut self, region: CaptureRegion) -> Result<Vec<u8>, CaptureError>;
}

/// Capture backend clipping the CDP page screenshot.
pub struct CdpCapture {
    driver: Arc<PageDriver>,
}

impl CdpCapture {
    pub fn new(driver: Arc<PageDriver>) -> Self {
        Self { driver }
    }
}

#[async_trait]
impl CaptureGateway for CdpCapture {
    async fn capture(&mut self, region: CaptureRegion) -> Result<Vec<u8>, CaptureError> {
        let result = match region {
            CaptureRegion::Viewport => self.driver.screenshot_viewport().await,
            CaptureRegion::Region(r) => self.driver.screenshot_clip(clip_of(r)).await,
        };
        result.map_err(|e| CaptureError::Backend(e.to_string()))
    }
}

/// Writes screenshots under `ad_<YYYYmmdd_HHMMSS>.png` names, suffixing
/// `_2`, `_3`, ... on same-second collisions.
#[derive(Debug, Clone)]
pub struct ScreenshotStore {
    folder: PathBuf,
}

impl ScreenshotStore {
    /// Open (creating if needed) the screenshot folder.
    pub fn new(folder: &Path) -> Result<Self, SwapError> {
        std::fs::create_dir_all(folder).map_err(|e| {
            SwapError::Setup(format!(
                "cannot create screenshot folder {}: {e}",
                folder.display()
            ))
        })?;
        Ok(Self {
            folder: folder.to_path_buf(),
        })
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }

    /// Write capture bytes, returning the path they landed at.
    pub fn save(&self, bytes: &[u8], at: DateTime<Utc>) -> Result<PathBuf, SwapError> {
        let mut sequence = 1;
        loop {
            let path = self.folder.join(screenshot_filename(at, sequence));
            if path.exists() {
                sequence += 1;
                continue;
            }
            std::fs::write(&path, bytes)
                .map_err(|e| SwapError::Capture(format!("writing {}: {e}", path.display())))?;
            tracing::debug!(path = %path.display(), bytes = bytes.len(), "screenshot written");
            return Ok(path);
        }
    }
}

/// Build the timestamped screenshot filename.
pub fn screenshot_filename(at: DateTime<Utc>, sequence: u32) -> String {
    let stamp = at.format("%Y%m%d_%H%M%S");
    if sequence <= 1 {
        format!("ad_{stamp}.png")
    } else {
        format!("ad_{stamp}_{sequence}.png")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 5, 10, 15, 0).unwrap()
    }

    #[test]
    fn filename_format() {
        assert_eq!(screenshot_filename(at(), 1), "ad_20260805_101500.png");
        assert_eq!(screenshot_filename(at(), 0), "ad_20260805_101500.png");
        assert_eq!(screenshot_filename(at(), 3), "ad_20260805_101500_3.png");
    }

    #[test]
    fn save_writes_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let store = ScreenshotStore::new(dir.path()).unwrap();
        let path = store.save(&[1, 2, 3], at()).unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), vec![1, 2, 3]);
        assert!(path.file_name().unwrap().to_str().unwrap().starts_with("ad_"));
    }

    #[test]
    fn save_suffixes_on_collision() {
        let dir = tempfile::tempdir().unwrap();
        let store = ScreenshotStore::new(dir.path()).unwrap();
        let first = store.save(&[1], at()).unwrap();
        let second = store.save(&[2], at()).unwrap();
        let third = store.save(&[3], at()).unwrap();
        assert_ne!(first, second);
        assert_ne!(second, third);
        assert!(second.to_str().unwrap().ends_with("_2.png"));
        assert!(third.to_str().unwrap().ends_with("_3.png"));
    }

    #[test]
    fn new_creates_nested_folder() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("data").join("screenshots");
        let store = ScreenshotStore::new(&nested).unwrap();
        assert!(store.folder().is_dir());
    }
}
