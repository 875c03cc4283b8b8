//! Error containment: navigation, mutation, and capture failures.

mod common;

use adswap_engine::CaptureRegion;
use adswap_harness::{MockBrowserBuilder, MockCapture, MockElement};
use adswap_types::SessionOutcome;

use common::{pages, TestSession};

fn banner() -> MockElement {
    MockElement::new("div", 300, 250, 412.0, 20.0).class("ad-banner")
}

#[tokio::test]
async fn failed_navigation_skips_page_not_session() {
    let mut session = TestSession::with_creatives(&["img_300x250.jpg"]);
    session.browser = MockBrowserBuilder::new()
        .page("https://example.com/good", vec![banner()])
        .fail_navigation("https://example.com/dead")
        .build();
    let assembled = session.assemble();

    let report = assembled
        .orchestrator
        .run(pages(&["https://example.com/dead", "https://example.com/good"]))
        .await
        .expect("session runs");

    assert_eq!(report.pages_skipped, 1);
    assert_eq!(report.pages_processed, 1);
    assert_eq!(report.captures, 1);
}

#[tokio::test]
async fn gateway_failure_falls_back_to_native_screenshot_once() {
    let mut session = TestSession::with_creatives(&["img_300x250.jpg"]);
    session.browser = MockBrowserBuilder::new()
        .page("https://example.com/a", vec![banner()])
        .build();
    session.capture = MockCapture::new().fail_times(1);
    let assembled = session.assemble();

    let report = assembled
        .orchestrator
        .run(pages(&["https://example.com/a"]))
        .await
        .expect("session runs");

    // The gateway was asked once for the surface region; the record still
    // exists because the native viewport screenshot stepped in.
    assert_eq!(report.captures, 1);
    let calls = assembled.capture.calls();
    assert_eq!(calls.len(), 1);
    assert!(matches!(calls[0], CaptureRegion::Region(_)));
}

#[tokio::test]
async fn double_capture_failure_skips_attempt_and_still_restores() {
    let url = "https://example.com/a";
    let mut session = TestSession::with_creatives(&["img_300x250.jpg"]);
    session.browser = MockBrowserBuilder::new()
        .page(url, vec![banner()])
        .fail_viewport_screenshot()
        .build();
    session.capture = MockCapture::new().fail_always();
    let assembled = session.assemble();

    let report = assembled
        .orchestrator
        .run(pages(&[url]))
        .await
        .expect("session runs");

    // No retry loop beyond the single fallback: one gateway call, no
    // record, and the mutation was still reverted.
    assert_eq!(report.captures, 0);
    assert_eq!(assembled.capture.calls().len(), 1);
    assert!(assembled.browser.page_is_pristine(url));
}

#[tokio::test]
async fn mutation_refusal_skips_surface_and_continues() {
    let url = "https://example.com/a";
    let mut session = TestSession::with_creatives(&["img_300x250.jpg"]);
    session.browser = MockBrowserBuilder::new()
        .page(
            url,
            vec![
                MockElement::new("div", 300, 250, 100.0, 20.0)
                    .class("ad-box")
                    .refuse_mutation(),
                banner(),
            ],
        )
        .build();
    let assembled = session.assemble();

    let report = assembled
        .orchestrator
        .run(pages(&[url]))
        .await
        .expect("session runs");

    // The refusing surface is skipped; the other one is captured.
    assert_eq!(report.captures, 1);
    assert_eq!(report.records[0].position, "top:412,left:20");
    assert!(assembled.browser.page_is_pristine(url));
}

#[tokio::test]
async fn reflowed_surface_fails_the_recheck_and_is_skipped() {
    let url = "https://example.com/a";
    let mut session = TestSession::with_creatives(&["img_300x250.jpg"]);
    session.browser = MockBrowserBuilder::new()
        .page(
            url,
            vec![MockElement::new("div", 300, 250, 100.0, 20.0)
                .class("ad-box")
                .shrink_on_verify()],
        )
        .build();
    let assembled = session.assemble();

    let report = assembled
        .orchestrator
        .run(pages(&[url]))
        .await
        .expect("session runs");

    assert_eq!(report.captures, 0);
    assert_eq!(report.outcome, SessionOutcome::PagesExhausted);
    // Never mutated, so trivially pristine.
    assert!(assembled.browser.page_is_pristine(url));
}

#[tokio::test]
async fn empty_inventory_is_a_fatal_setup_error() {
    use adswap_engine::{inventory, Orchestrator, RotationPolicy, ScreenshotStore};
    use adswap_harness::MockBrowser;
    use adswap_types::{AdSwapConfig, SwapError};

    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("not-a-creative.txt"), b"x").unwrap();
    assert!(inventory::load_creatives(dir.path()).is_err());

    // A policy built from nothing refuses orchestration before any page
    // is processed.
    let shots = tempfile::tempdir().unwrap();
    let result = Orchestrator::new(
        MockBrowser::default(),
        MockCapture::new(),
        RotationPolicy::new(Vec::new(), Default::default()),
        ScreenshotStore::new(shots.path()).unwrap(),
        AdSwapConfig::default(),
    );
    assert!(matches!(result, Err(SwapError::Setup(_))));
}
