//! The browser capability the orchestrator consumes.
//!
//! [`Browser`] is a semantic seam: the orchestrator asks for scans,
//! verifications, mutations, restores, and screenshots — never for raw
//! JavaScript. [`CdpBrowser`] renders each operation to the page scripts in
//! [`scanner`](crate::scanner) and [`mutate`](crate::mutate) and ships them
//! over CDP; the test harness substitutes an in-memory page model behind
//! the same trait.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use adswap_browser::driver::Clip;
use adswap_browser::{BrowserError, PageDriver};
use adswap_types::{Dimension, Region, SwapError};

use crate::mutate::{self, MutationStatus};
use crate::overlay::OverlayButtons;
use crate::scanner::{self, ScanResult, SurfaceHandle, SurfaceKind};

/// Fraction of the viewport height above a surface when it is scrolled
/// into position for capture.
pub const VIEWPORT_ANCHOR_FRACTION: f64 = 0.30;

fn browser_err(e: BrowserError) -> SwapError {
    SwapError::Browser(e.to_string())
}

/// Everything the replacement engine needs from a rendered page.
///
/// Implementations own the timing of their settle pauses; the orchestrator
/// only sequences operations.
#[async_trait]
pub trait Browser: Send {
    /// Navigate to a page, wait for it to load, and let it settle.
    async fn open_page(&mut self, url: &str, timeout: Duration) -> Result<(), SwapError>;

    /// Best-effort removal of full-viewport overlay elements. Returns the
    /// number removed.
    async fn strip_overlays(&mut self) -> Result<u32, SwapError>;

    /// Scroll to the bottom and back to the top to trigger lazy-loaded
    /// content.
    async fn trigger_lazy_content(&mut self) -> Result<(), SwapError>;

    /// Scan the page for visible elements of exactly the target dimension.
    /// Invalidates all handles from earlier scans.
    async fn scan(&mut self, target: Dimension) -> Result<ScanResult, SwapError>;

    /// Re-check that a surface still has the target dimension (guards the
    /// reflow race between scan and mutation). Stale handles report false.
    async fn surface_matches(
        &mut self,
        handle: SurfaceHandle,
        target: Dimension,
    ) -> Result<bool, SwapError>;

    /// Substitute the creative into the surface, kind-dispatched.
    async fn mutate(
        &mut self,
        handle: SurfaceHandle,
        kind: SurfaceKind,
        image_uri: &str,
        overlay: Option<&OverlayButtons>,
    ) -> Result<MutationStatus, SwapError>;

    /// Revert a mutated surface to its pre-mutation state.
    async fn restore(
        &mut self,
        handle: SurfaceHandle,
        kind: SurfaceKind,
    ) -> Result<MutationStatus, SwapError>;

    /// Scroll the surface to the capture anchor position and return its
    /// viewport-relative box.
    async fn bring_into_view(
        &mut self,
        handle: SurfaceHandle,
        fraction: f64,
    ) -> Result<Region, SwapError>;

    /// Native full-viewport screenshot, the single capture fallback.
    async fn viewport_screenshot(&mut self) -> Result<Vec<u8>, SwapError>;
}

/// CDP-backed [`Browser`] implementation.
pub struct CdpBrowser {
    driver: Arc<PageDriver>,
    settle: Duration,
}

impl CdpBrowser {
    /// Wrap a connected page driver. `settle` is the fixed inter-step
    /// delay applied after navigation, scrolling, and before capture.
    pub fn new(driver: Arc<PageDriver>, settle: Duration) -> Self {
        Self { driver, settle }
    }

    async fn settle(&self) {
        tokio::time::sleep(self.settle).await;
    }

    fn handle_args(handle: SurfaceHandle) -> [Value; 2] {
        [Value::from(handle.epoch), Value::from(handle.index)]
    }
}

#[async_trait]
impl Browser for CdpBrowser {
    async fn open_page(&mut self, url: &str, timeout: Duration) -> Result<(), SwapError> {
        self.driver
            .open(url, timeout)
            .await
            .map_err(|e| SwapError::Navigation {
                url: url.to_string(),
                reason: e.to_string(),
            })?;
        self.settle().await;
        Ok(())
    }

    async fn strip_overlays(&mut self) -> Result<u32, SwapError> {
        let value = self
            .driver
            .call_fn(mutate::STRIP_OVERLAYS_FN, &[])
            .await
            .map_err(browser_err)?;
        Ok(value.as_u64().unwrap_or(0) as u32)
    }

    async fn trigger_lazy_content(&mut self) -> Result<(), SwapError> {
        let height = self
            .driver
            .evaluate("document.body ? document.body.scrollHeight : 0")
            .await
            .map_err(browser_err)?
            .as_f64()
            .unwrap_or(0.0);
        self.driver.scroll_to(0.0, height).await.map_err(browser_err)?;
        self.settle().await;
        self.driver.scroll_to(0.0, 0.0).await.map_err(browser_err)?;
        self.settle().await;
        Ok(())
    }

    async fn scan(&mut self, target: Dimension) -> Result<ScanResult, SwapError> {
        let value = self
            .driver
            .call_fn(
                scanner::SCAN_SURFACES_FN,
                &[Value::from(target.width), Value::from(target.height)],
            )
            .await
            .map_err(browser_err)?;
        scanner::parse_scan_result(value)
    }

    async fn surface_matches(
        &mut self,
        handle: SurfaceHandle,
        target: Dimension,
    ) -> Result<bool, SwapError> {
        let [epoch, index] = Self::handle_args(handle);
        let value = self
            .driver
            .call_fn(
                mutate::VERIFY_SURFACE_FN,
                &[
                    epoch,
                    index,
                    Value::from(target.width),
                    Value::from(target.height),
                ],
            )
            .await
            .map_err(browser_err)?;
        Ok(value.as_str() == Some("ok"))
    }

    async fn mutate(
        &mut self,
        handle: SurfaceHandle,
        kind: SurfaceKind,
        image_uri: &str,
        overlay: Option<&OverlayButtons>,
    ) -> Result<MutationStatus, SwapError> {
        let [epoch, index] = Self::handle_args(handle);
        let (close_html, close_css, info_html, info_css) = match overlay {
            Some(b) => (
                b.close_html.as_str(),
                b.close_css.as_str(),
                b.info_html.as_str(),
                b.info_css.as_str(),
            ),
            None => ("", "", "", ""),
        };
        let value = self
            .driver
            .call_fn(
                kind.scripts().mutate,
                &[
                    epoch,
                    index,
                    Value::from(image_uri),
                    Value::from(close_html),
                    Value::from(close_css),
                    Value::from(info_html),
                    Value::from(info_css),
                    Value::from(overlay.is_some()),
                ],
            )
            .await
            .map_err(browser_err)?;
        mutate::decode_outcome(&value)
    }

    async fn restore(
        &mut self,
        handle: SurfaceHandle,
        kind: SurfaceKind,
    ) -> Result<MutationStatus, SwapError> {
        let [epoch, index] = Self::handle_args(handle);
        let value = self
            .driver
            .call_fn(kind.scripts().restore, &[epoch, index])
            .await
            .map_err(browser_err)?;
        mutate::decode_outcome(&value)
    }

    async fn bring_into_view(
        &mut self,
        handle: SurfaceHandle,
        fraction: f64,
    ) -> Result<Region, SwapError> {
        let [epoch, index] = Self::handle_args(handle);
        let value = self
            .driver
            .call_fn(
                mutate::SCROLL_SURFACE_FN,
                &[epoch, index, Value::from(fraction)],
            )
            .await
            .map_err(browser_err)?;
        let region = mutate::parse_scroll_result(&value)?.ok_or(SwapError::Mutation {
            reason: "surface handle went stale before capture".to_string(),
        })?;
        self.settle().await;
        Ok(region)
    }

    async fn viewport_screenshot(&mut self) -> Result<Vec<u8>, SwapError> {
        self.driver
            .screenshot_viewport()
            .await
            .map_err(|e| SwapError::Capture(e.to_string()))
    }
}

/// Convert an engine region into a driver clip rectangle.
pub fn clip_of(region: Region) -> Clip {
    Clip {
        x: region.x,
        y: region.y,
        width: region.width,
        height: region.height,
    }
}
