//! The replacement orchestrator: a state machine sequencing
//! scan → match → mutate → capture → restore per page.
//!
//! Execution is strictly sequential — one page, one creative, one surface
//! at a time. Creatives are processed in rotation-policy order; surfaces
//! in scan-return order after dedup. The policy's halt condition is
//! consulted after every capture and stops the entire run the instant it
//! holds, even with unprocessed pages remaining.
//!
//! Error containment: anything that goes wrong while processing one
//! surface is caught, logged with page/creative/position context, and the
//! loop advances to the next surface. A failed navigation abandons the
//! page, not the session. Only setup problems are fatal.

use std::collections::HashSet;
use std::fmt;

use chrono::Utc;
use tracing::{debug, info, warn};

use adswap_types::{
    AdSwapConfig, Dimension, ReplacementRecord, SessionOutcome, SessionReport, SessionState,
    SwapError,
};

use crate::browse::{Browser, VIEWPORT_ANCHOR_FRACTION};
use crate::capture::{CaptureGateway, CaptureRegion, ScreenshotStore};
use crate::inventory::{self, Creative};
use crate::mutate::MutationStatus;
use crate::overlay::{self, OverlayButtons};
use crate::rotation::RotationPolicy;
use crate::scanner::Surface;

/// States of the per-page replacement machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    PageLoaded,
    Scanning,
    Matched,
    Mutated,
    Captured,
    Restored,
    PageDone,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Idle => "idle",
            Phase::PageLoaded => "page-loaded",
            Phase::Scanning => "scanning",
            Phase::Matched => "matched",
            Phase::Mutated => "mutated",
            Phase::Captured => "captured",
            Phase::Restored => "restored",
            Phase::PageDone => "page-done",
        };
        f.write_str(name)
    }
}

/// Drives one session over a browser and capture gateway.
pub struct Orchestrator<B: Browser, G: CaptureGateway> {
    browser: B,
    gateway: G,
    policy: RotationPolicy,
    store: ScreenshotStore,
    config: AdSwapConfig,
    session: SessionState,
    phase: Phase,
    records: Vec<ReplacementRecord>,
    pages_processed: u32,
    pages_skipped: u32,
}

impl<B: Browser, G: CaptureGateway> Orchestrator<B, G> {
    /// Assemble a session. Fails with [`SwapError::Setup`] when the
    /// rotation policy carries no creatives.
    pub fn new(
        browser: B,
        gateway: G,
        policy: RotationPolicy,
        store: ScreenshotStore,
        config: AdSwapConfig,
    ) -> Result<Self, SwapError> {
        if policy.is_empty() {
            return Err(SwapError::Setup("creative inventory is empty".into()));
        }
        let session = SessionState::new(config.target_captures);
        Ok(Self {
            browser,
            gateway,
            policy,
            store,
            config,
            session,
            phase: Phase::Idle,
            records: Vec::new(),
            pages_processed: 0,
            pages_skipped: 0,
        })
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    /// Run the session over a finite, externally supplied page sequence.
    pub async fn run(
        mut self,
        pages: impl IntoIterator<Item = String>,
    ) -> Result<SessionReport, SwapError> {
        let started_at = Utc::now();
        let overlay = overlay::buttons_for(self.config.button_style);
        info!(
            session = %self.session.id,
            target = self.session.target,
            creatives = self.policy.creatives().len(),
            "session started"
        );

        let mut outcome = SessionOutcome::PagesExhausted;
        for url in pages {
            if self.policy.should_halt(&self.session) {
                outcome = SessionOutcome::TargetReached;
                break;
            }
            if !self.session.visit(&url) {
                debug!(page = %url, "already visited, skipping");
                continue;
            }

            self.transition(Phase::Idle);
            if let Err(e) = self
                .browser
                .open_page(&url, self.config.page_timeout())
                .await
            {
                warn!(page = %url, error = %e, "page abandoned");
                self.pages_skipped += 1;
                self.session.finish_page(0);
                if self.failure_limit_hit() {
                    outcome = SessionOutcome::FailureLimit;
                    break;
                }
                continue;
            }
            self.transition(Phase::PageLoaded);
            self.prepare_page().await;

            let before = self.session.total;
            let halted = self.process_page(&url, overlay.as_ref()).await;
            self.pages_processed += 1;
            let page_captures = self.session.total - before;
            self.session.finish_page(page_captures);
            self.transition(Phase::PageDone);
            info!(
                page = %url,
                captures = page_captures,
                total = self.session.total,
                "page finished"
            );

            if halted {
                outcome = SessionOutcome::TargetReached;
                break;
            }
            if self.failure_limit_hit() {
                outcome = SessionOutcome::FailureLimit;
                break;
            }
        }
        if self.session.target_met() {
            outcome = SessionOutcome::TargetReached;
        }

        let report = SessionReport {
            session_id: self.session.id,
            started_at,
            finished_at: Utc::now(),
            pages_processed: self.pages_processed,
            pages_skipped: self.pages_skipped,
            captures: self.session.total,
            outcome,
            records: self.records,
        };
        info!(
            captures = report.captures,
            pages = report.pages_processed,
            skipped = report.pages_skipped,
            outcome = ?report.outcome,
            "session finished"
        );
        Ok(report)
    }

    /// Overlay strip and lazy-load trigger, both best-effort.
    async fn prepare_page(&mut self) {
        match self.browser.strip_overlays().await {
            Ok(0) => {}
            Ok(n) => debug!(removed = n, "stripped full-viewport overlays"),
            Err(e) => debug!(error = %e, "overlay strip failed"),
        }
        if let Err(e) = self.browser.trigger_lazy_content().await {
            debug!(error = %e, "lazy-load scroll cycle failed");
        }
    }

    /// Loop every creative over the current page. Returns true when the
    /// policy signalled a session halt.
    async fn process_page(&mut self, url: &str, overlay: Option<&OverlayButtons>) -> bool {
        let mut seen: HashSet<(String, Dimension)> = HashSet::new();
        let mut cursor = self.policy.cursor();

        while let Some(creative) = self.policy.next(&mut cursor) {
            if self.policy.should_halt(&self.session) {
                return true;
            }

            let data_uri = match inventory::load_data_uri(&creative) {
                Ok(uri) => uri,
                Err(e) => {
                    warn!(creative = %creative.id, error = %e, "creative unreadable, skipping");
                    continue;
                }
            };

            self.transition(Phase::Scanning);
            let scan = match self.browser.scan(creative.dimension).await {
                Ok(scan) => scan,
                Err(e) => {
                    warn!(page = %url, creative = %creative.id, error = %e, "scan failed");
                    continue;
                }
            };
            let surfaces = crate::matcher::match_surfaces(&scan, &self.config.ad_keywords);
            self.transition(Phase::Matched);

            let fresh: Vec<Surface> = surfaces
                .into_iter()
                .filter(|s| !seen.contains(&(s.position_key(), creative.dimension)))
                .collect();
            if fresh.is_empty() {
                debug!(creative = %creative.id, dimension = %creative.dimension, "no fresh surfaces");
                continue;
            }
            debug!(
                creative = %creative.id,
                surfaces = fresh.len(),
                "surfaces matched"
            );

            for surface in fresh {
                let key = (surface.position_key(), creative.dimension);
                if seen.contains(&key) {
                    continue;
                }
                match self
                    .process_surface(url, &creative, &surface, &data_uri, overlay)
                    .await
                {
                    Ok(true) => {
                        seen.insert(key);
                        if self.policy.should_halt(&self.session) {
                            return true;
                        }
                    }
                    Ok(false) => {}
                    Err(e) => {
                        // A single surface failure never aborts the page.
                        warn!(
                            page = %url,
                            creative = %creative.id,
                            position = %surface.position_key(),
                            error = %e,
                            "surface skipped"
                        );
                    }
                }
            }
        }
        false
    }

    /// Verify, mutate, capture, and restore one surface. Returns whether a
    /// replacement record was appended. The surface is restored on every
    /// path that mutated it.
    async fn process_surface(
        &mut self,
        url: &str,
        creative: &Creative,
        surface: &Surface,
        data_uri: &str,
        overlay: Option<&OverlayButtons>,
    ) -> Result<bool, SwapError> {
        if !self
            .browser
            .surface_matches(surface.handle, creative.dimension)
            .await?
        {
            debug!(position = %surface.position_key(), "surface reflowed since scan, skipping");
            return Ok(false);
        }

        match self
            .browser
            .mutate(surface.handle, surface.kind, data_uri, overlay)
            .await?
        {
            MutationStatus::Applied => {}
            MutationStatus::Unchanged => {
                debug!(position = %surface.position_key(), "mutation made no observable change");
                return Ok(false);
            }
            MutationStatus::Stale => {
                debug!(position = %surface.position_key(), "surface handle went stale");
                return Ok(false);
            }
        }
        self.transition(Phase::Mutated);

        let captured = self.capture_surface(url, creative, surface).await;

        match self.browser.restore(surface.handle, surface.kind).await {
            Ok(MutationStatus::Applied) => {}
            Ok(status) => warn!(
                page = %url,
                position = %surface.position_key(),
                ?status,
                "restore did not complete cleanly"
            ),
            Err(e) => warn!(
                page = %url,
                position = %surface.position_key(),
                error = %e,
                "restore failed"
            ),
        }
        self.transition(Phase::Restored);

        captured
    }

    /// Position, capture (with the single native-screenshot fallback), and
    /// record one mutated surface.
    async fn capture_surface(
        &mut self,
        url: &str,
        creative: &Creative,
        surface: &Surface,
    ) -> Result<bool, SwapError> {
        let bytes = match self
            .browser
            .bring_into_view(surface.handle, VIEWPORT_ANCHOR_FRACTION)
            .await
        {
            Ok(region) => {
                self.capture_with_fallback(CaptureRegion::Region(region))
                    .await
            }
            Err(e) => {
                warn!(error = %e, "could not position surface, capturing viewport");
                self.capture_with_fallback(CaptureRegion::Viewport).await
            }
        };
        let Some(bytes) = bytes else {
            return Ok(false);
        };
        self.transition(Phase::Captured);

        let now = Utc::now();
        let path = self.store.save(&bytes, now)?;
        self.records.push(ReplacementRecord {
            position: surface.position_key(),
            creative_id: creative.id.clone(),
            dimension: creative.dimension,
            timestamp: now,
            screenshot: path.clone(),
            page_url: url.to_string(),
        });
        self.session.record_capture();
        self.policy.record_use(&creative.id);
        info!(
            page = %url,
            creative = %creative.id,
            position = %surface.position_key(),
            screenshot = %path.display(),
            total = self.session.total,
            "replacement captured"
        );
        Ok(true)
    }

    /// One gateway attempt, one native-screenshot fallback, no further
    /// retries.
    async fn capture_with_fallback(&mut self, region: CaptureRegion) -> Option<Vec<u8>> {
        match self.gateway.capture(region).await {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                warn!(error = %e, "capture gateway failed, trying native screenshot");
                match self.browser.viewport_screenshot().await {
                    Ok(bytes) => Some(bytes),
                    Err(e2) => {
                        warn!(error = %e2, "fallback screenshot failed, attempt skipped");
                        None
                    }
                }
            }
        }
    }

    fn failure_limit_hit(&self) -> bool {
        let hit = self.session.consecutive_failures >= self.config.max_consecutive_failures;
        if hit {
            info!(
                limit = self.config.max_consecutive_failures,
                "consecutive-failure limit reached, ending session"
            );
        }
        hit
    }

    fn transition(&mut self, to: Phase) {
        if self.phase != to {
            debug!(from = %self.phase, to = %to, "phase");
            self.phase = to;
        }
    }
}
