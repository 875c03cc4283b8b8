//! Mock implementations of the engine's browser and capture seams.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use adswap_engine::browse::Browser;
use adswap_engine::capture::{CaptureError, CaptureGateway, CaptureRegion};
use adswap_engine::mutate::MutationStatus;
use adswap_engine::overlay::OverlayButtons;
use adswap_engine::scanner::{ScanResult, SurfaceDescriptor, SurfaceHandle, SurfaceKind};
use adswap_types::{Dimension, Region, SwapError};

// ---------------------------------------------------------------------------
// MockElement
// ---------------------------------------------------------------------------

/// One element of a mock page.
///
/// Scriptable knobs: `hidden` removes it from scans, `lazy` keeps it out
/// of scans until the lazy-load cycle has run, `shrink_on_verify` makes
/// the pre-mutation re-check fail (reflow race), `refuse_mutation` makes
/// mutation report no observable change.
#[derive(Debug, Clone)]
pub struct MockElement {
    pub tag: String,
    pub width: u32,
    pub height: u32,
    pub top: f64,
    pub left: f64,
    pub class_name: String,
    pub id: String,
    pub src: String,
    pub background: bool,
    pub hidden: bool,
    pub lazy: bool,
    pub shrink_on_verify: bool,
    pub refuse_mutation: bool,

    // Runtime state the engine mutates through the Browser trait.
    pub mutated: bool,
    pub stashed_src: Option<String>,
    pub injected_nodes: u32,
}

impl MockElement {
    pub fn new(tag: &str, width: u32, height: u32, top: f64, left: f64) -> Self {
        Self {
            tag: tag.to_string(),
            width,
            height,
            top,
            left,
            class_name: String::new(),
            id: String::new(),
            src: String::new(),
            background: false,
            hidden: false,
            lazy: false,
            shrink_on_verify: false,
            refuse_mutation: false,
            mutated: false,
            stashed_src: None,
            injected_nodes: 0,
        }
    }

    pub fn class(mut self, class_name: &str) -> Self {
        self.class_name = class_name.to_string();
        self
    }

    pub fn id(mut self, id: &str) -> Self {
        self.id = id.to_string();
        self
    }

    pub fn src(mut self, src: &str) -> Self {
        self.src = src.to_string();
        self
    }

    pub fn with_background(mut self) -> Self {
        self.background = true;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn lazy(mut self) -> Self {
        self.lazy = true;
        self
    }

    pub fn shrink_on_verify(mut self) -> Self {
        self.shrink_on_verify = true;
        self
    }

    pub fn refuse_mutation(mut self) -> Self {
        self.refuse_mutation = true;
        self
    }

    /// Content kind the scan script would assign. The mock page is flat,
    /// so the element's own tag decides.
    pub fn kind(&self) -> SurfaceKind {
        match self.tag.as_str() {
            "img" => SurfaceKind::Image,
            "iframe" => SurfaceKind::Frame,
            _ => SurfaceKind::Background,
        }
    }

    /// Whether the element is back in its pre-mutation state.
    pub fn is_pristine(&self) -> bool {
        !self.mutated && self.stashed_src.is_none() && self.injected_nodes == 0
    }
}

// ---------------------------------------------------------------------------
// MockBrowser
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct MockBrowserInner {
    pages: HashMap<String, Vec<MockElement>>,
    fail_navigation: HashSet<String>,
    fail_viewport_screenshot: bool,

    current: Option<String>,
    lazy_triggered: bool,
    epoch: u64,
    /// Arena: scan-index -> element-index of the current page.
    arena: Vec<usize>,

    scan_calls: u32,
    overlay_strips: u32,
}

/// In-memory [`Browser`] implementation.
#[derive(Debug, Clone, Default)]
pub struct MockBrowser {
    inner: Arc<Mutex<MockBrowserInner>>,
}

/// Fluent setup for [`MockBrowser`].
#[derive(Debug, Default)]
pub struct MockBrowserBuilder {
    inner: MockBrowserInner,
}

impl MockBrowserBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a page and its elements.
    pub fn page(mut self, url: &str, elements: Vec<MockElement>) -> Self {
        self.inner.pages.insert(url.to_string(), elements);
        self
    }

    /// Make navigation to a URL fail with a timeout.
    pub fn fail_navigation(mut self, url: &str) -> Self {
        self.inner.fail_navigation.insert(url.to_string());
        self
    }

    /// Make the native viewport screenshot fail too (breaks the capture
    /// fallback).
    pub fn fail_viewport_screenshot(mut self) -> Self {
        self.inner.fail_viewport_screenshot = true;
        self
    }

    pub fn build(self) -> MockBrowser {
        MockBrowser {
            inner: Arc::new(Mutex::new(self.inner)),
        }
    }
}

impl MockBrowser {
    fn lock(&self) -> std::sync::MutexGuard<'_, MockBrowserInner> {
        self.inner.lock().expect("mock browser lock poisoned")
    }

    /// Number of scans executed so far.
    pub fn scan_calls(&self) -> u32 {
        self.lock().scan_calls
    }

    /// Clone of a page's elements, runtime state included.
    pub fn elements(&self, url: &str) -> Vec<MockElement> {
        self.lock().pages.get(url).cloned().unwrap_or_default()
    }

    /// Whether every element of a page is back in its pre-mutation state.
    pub fn page_is_pristine(&self, url: &str) -> bool {
        self.elements(url).iter().all(MockElement::is_pristine)
    }

    /// Resolve a handle to its element index, if still valid.
    fn resolve(inner: &MockBrowserInner, handle: SurfaceHandle) -> Option<usize> {
        if handle.epoch != inner.epoch {
            return None;
        }
        inner.arena.get(handle.index as usize).copied()
    }

    fn current_elements<'a>(
        inner: &'a mut MockBrowserInner,
    ) -> Result<&'a mut Vec<MockElement>, SwapError> {
        let url = inner
            .current
            .clone()
            .ok_or_else(|| SwapError::Browser("no page open".into()))?;
        inner
            .pages
            .get_mut(&url)
            .ok_or_else(|| SwapError::Browser(format!("unknown page {url}")))
    }
}

#[async_trait]
impl Browser for MockBrowser {
    async fn open_page(&mut self, url: &str, _timeout: Duration) -> Result<(), SwapError> {
        let mut inner = self.lock();
        if inner.fail_navigation.contains(url) {
            return Err(SwapError::Navigation {
                url: url.to_string(),
                reason: "page load timed out".to_string(),
            });
        }
        if !inner.pages.contains_key(url) {
            return Err(SwapError::Navigation {
                url: url.to_string(),
                reason: "net::ERR_NAME_NOT_RESOLVED".to_string(),
            });
        }
        inner.current = Some(url.to_string());
        inner.lazy_triggered = false;
        // Navigation wipes the arena wholesale.
        inner.arena.clear();
        inner.epoch += 1;
        Ok(())
    }

    async fn strip_overlays(&mut self) -> Result<u32, SwapError> {
        let mut inner = self.lock();
        inner.overlay_strips += 1;
        Ok(0)
    }

    async fn trigger_lazy_content(&mut self) -> Result<(), SwapError> {
        self.lock().lazy_triggered = true;
        Ok(())
    }

    async fn scan(&mut self, target: Dimension) -> Result<ScanResult, SwapError> {
        let mut inner = self.lock();
        inner.scan_calls += 1;
        inner.epoch += 1;
        let epoch = inner.epoch;
        let lazy_triggered = inner.lazy_triggered;

        let elements = Self::current_elements(&mut inner)?.clone();
        let mut arena = Vec::new();
        let mut surfaces = Vec::new();
        for (element_index, el) in elements.iter().enumerate() {
            if el.hidden || (el.lazy && !lazy_triggered) {
                continue;
            }
            if el.width != target.width || el.height != target.height {
                continue;
            }
            surfaces.push(SurfaceDescriptor {
                index: arena.len() as u32,
                width: el.width,
                height: el.height,
                top: el.top,
                left: el.left,
                tag: el.tag.clone(),
                class_name: el.class_name.clone(),
                id: el.id.clone(),
                src: el.src.clone(),
                background: el.background,
                kind: el.kind(),
            });
            arena.push(element_index);
        }
        inner.arena = arena;
        Ok(ScanResult { epoch, surfaces })
    }

    async fn surface_matches(
        &mut self,
        handle: SurfaceHandle,
        target: Dimension,
    ) -> Result<bool, SwapError> {
        let mut inner = self.lock();
        let Some(element_index) = Self::resolve(&inner, handle) else {
            return Ok(false);
        };
        let el = &Self::current_elements(&mut inner)?[element_index];
        if el.shrink_on_verify {
            return Ok(false);
        }
        Ok(el.width == target.width && el.height == target.height)
    }

    async fn mutate(
        &mut self,
        handle: SurfaceHandle,
        _kind: SurfaceKind,
        image_uri: &str,
        overlay: Option<&OverlayButtons>,
    ) -> Result<MutationStatus, SwapError> {
        let mut inner = self.lock();
        let Some(element_index) = Self::resolve(&inner, handle) else {
            return Ok(MutationStatus::Stale);
        };
        let with_buttons = overlay.is_some();
        let el = &mut Self::current_elements(&mut inner)?[element_index];
        if el.refuse_mutation {
            return Ok(MutationStatus::Unchanged);
        }
        el.mutated = true;
        match el.kind() {
            SurfaceKind::Image => {
                el.stashed_src = Some(std::mem::replace(&mut el.src, image_uri.to_string()));
            }
            SurfaceKind::Frame => {
                el.injected_nodes += 1;
            }
            SurfaceKind::Background => {}
        }
        if with_buttons {
            el.injected_nodes += 2;
        }
        Ok(MutationStatus::Applied)
    }

    async fn restore(
        &mut self,
        handle: SurfaceHandle,
        _kind: SurfaceKind,
    ) -> Result<MutationStatus, SwapError> {
        let mut inner = self.lock();
        let Some(element_index) = Self::resolve(&inner, handle) else {
            return Ok(MutationStatus::Stale);
        };
        let el = &mut Self::current_elements(&mut inner)?[element_index];
        if let Some(original) = el.stashed_src.take() {
            el.src = original;
        }
        el.injected_nodes = 0;
        el.mutated = false;
        Ok(MutationStatus::Applied)
    }

    async fn bring_into_view(
        &mut self,
        handle: SurfaceHandle,
        fraction: f64,
    ) -> Result<Region, SwapError> {
        let mut inner = self.lock();
        let Some(element_index) = Self::resolve(&inner, handle) else {
            return Err(SwapError::Mutation {
                reason: "surface handle went stale before capture".to_string(),
            });
        };
        let el = &Self::current_elements(&mut inner)?[element_index];
        // Pretend a 1080px viewport: the element lands `fraction` down.
        Ok(Region::new(
            el.left,
            1080.0 * fraction,
            f64::from(el.width),
            f64::from(el.height),
        ))
    }

    async fn viewport_screenshot(&mut self) -> Result<Vec<u8>, SwapError> {
        let inner = self.lock();
        if inner.fail_viewport_screenshot {
            return Err(SwapError::Capture("native screenshot failed".into()));
        }
        Ok(FAKE_PNG.to_vec())
    }
}

/// PNG magic bytes followed by a marker, enough for any byte-level check.
pub const FAKE_PNG: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0xAA];

// ---------------------------------------------------------------------------
// MockCapture
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct MockCaptureInner {
    fail_remaining: u32,
    fail_always: bool,
    calls: Vec<CaptureRegion>,
}

/// Scriptable [`CaptureGateway`] recording every request.
#[derive(Debug, Clone, Default)]
pub struct MockCapture {
    inner: Arc<Mutex<MockCaptureInner>>,
}

impl MockCapture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `n` capture calls, then succeed.
    pub fn fail_times(self, n: u32) -> Self {
        self.inner
            .lock()
            .expect("mock capture lock poisoned")
            .fail_remaining = n;
        self
    }

    /// Fail every capture call.
    pub fn fail_always(self) -> Self {
        self.inner
            .lock()
            .expect("mock capture lock poisoned")
            .fail_always = true;
        self
    }

    /// The regions requested so far, in order.
    pub fn calls(&self) -> Vec<CaptureRegion> {
        self.inner
            .lock()
            .expect("mock capture lock poisoned")
            .calls
            .clone()
    }
}

#[async_trait]
impl CaptureGateway for MockCapture {
    async fn capture(&mut self, region: CaptureRegion) -> Result<Vec<u8>, CaptureError> {
        let mut inner = self.inner.lock().expect("mock capture lock poisoned");
        inner.calls.push(region);
        if inner.fail_always {
            return Err(CaptureError::Backend("scripted failure".into()));
        }
        if inner.fail_remaining > 0 {
            inner.fail_remaining -= 1;
            return Err(CaptureError::Backend("scripted failure".into()));
        }
        Ok(FAKE_PNG.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dim(w: u32, h: u32) -> Dimension {
        Dimension::new(w, h)
    }

    #[tokio::test]
    async fn scan_registers_only_exact_visible_matches() {
        let mut browser = MockBrowserBuilder::new()
            .page(
                "https://example.com/a",
                vec![
                    MockElement::new("div", 300, 250, 100.0, 10.0).class("ad-banner"),
                    MockElement::new("div", 300, 250, 400.0, 10.0).hidden(),
                    MockElement::new("div", 728, 90, 700.0, 10.0),
                    MockElement::new("div", 300, 250, 900.0, 10.0).lazy(),
                ],
            )
            .build();

        browser
            .open_page("https://example.com/a", Duration::from_secs(1))
            .await
            .unwrap();
        let scan = browser.scan(dim(300, 250)).await.unwrap();
        assert_eq!(scan.surfaces.len(), 1);
        assert_eq!(scan.surfaces[0].class_name, "ad-banner");

        browser.trigger_lazy_content().await.unwrap();
        let scan = browser.scan(dim(300, 250)).await.unwrap();
        assert_eq!(scan.surfaces.len(), 2);
    }

    #[tokio::test]
    async fn handles_go_stale_across_navigation_and_rescan() {
        let mut browser = MockBrowserBuilder::new()
            .page(
                "https://example.com/a",
                vec![MockElement::new("img", 300, 250, 100.0, 10.0).src("https://cdn/x.jpg")],
            )
            .build();
        browser
            .open_page("https://example.com/a", Duration::from_secs(1))
            .await
            .unwrap();
        let scan = browser.scan(dim(300, 250)).await.unwrap();
        let handle = SurfaceHandle {
            epoch: scan.epoch,
            index: 0,
        };

        // A re-scan bumps the epoch; the old handle is rejected.
        browser.scan(dim(300, 250)).await.unwrap();
        assert_eq!(
            browser
                .mutate(handle, SurfaceKind::Image, "data:x", None)
                .await
                .unwrap(),
            MutationStatus::Stale
        );
    }

    #[tokio::test]
    async fn mutate_and_restore_roundtrip_is_pristine() {
        let url = "https://example.com/a";
        let mut browser = MockBrowserBuilder::new()
            .page(
                url,
                vec![MockElement::new("img", 300, 250, 100.0, 10.0).src("https://cdn/x.jpg")],
            )
            .build();
        let inspector = browser.clone();

        browser.open_page(url, Duration::from_secs(1)).await.unwrap();
        let scan = browser.scan(dim(300, 250)).await.unwrap();
        let handle = SurfaceHandle {
            epoch: scan.epoch,
            index: 0,
        };

        let buttons = adswap_engine::overlay::buttons_for(adswap_types::ButtonStyle::PlainCross);
        browser
            .mutate(handle, SurfaceKind::Image, "data:image/png;base64,x", buttons.as_ref())
            .await
            .unwrap();
        assert!(!inspector.page_is_pristine(url));
        let mutated = &inspector.elements(url)[0];
        assert_eq!(mutated.src, "data:image/png;base64,x");
        assert_eq!(mutated.injected_nodes, 2);

        browser.restore(handle, SurfaceKind::Image).await.unwrap();
        assert!(inspector.page_is_pristine(url));
        assert_eq!(inspector.elements(url)[0].src, "https://cdn/x.jpg");
    }

    #[tokio::test]
    async fn capture_failure_script() {
        let mut capture = MockCapture::new().fail_times(1);
        assert!(capture.capture(CaptureRegion::Viewport).await.is_err());
        assert!(capture.capture(CaptureRegion::Viewport).await.is_ok());
        assert_eq!(capture.calls().len(), 2);
    }
}
