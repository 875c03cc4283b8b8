//! Shared setup for engine integration tests.
//!
//! Each integration test file compiles common/ as its own module, so not
//! every helper is used in every file.
#![allow(dead_code)]

use std::collections::HashMap;

use tempfile::TempDir;

use adswap_engine::{inventory, Orchestrator, RotationPolicy, ScreenshotStore};
use adswap_harness::{fixtures, MockBrowser, MockCapture};
use adswap_types::{AdSwapConfig, Dimension};

/// Everything a test needs to run a session against mocks.
pub struct TestSession {
    pub browser: MockBrowser,
    pub capture: MockCapture,
    pub config: AdSwapConfig,
    creatives_dir: TempDir,
    shots_dir: TempDir,
    policy: RotationPolicy,
}

/// An assembled orchestrator plus the inspection handles and live
/// tempdirs backing it.
pub struct Assembled {
    pub orchestrator: Orchestrator<MockBrowser, MockCapture>,
    pub browser: MockBrowser,
    pub capture: MockCapture,
    pub shots_dir: TempDir,
    pub creatives_dir: TempDir,
}

impl TestSession {
    /// Build a session over the given creative filenames.
    pub fn with_creatives(names: &[&str]) -> Self {
        Self::with_creatives_and_caps(names, &[])
    }

    /// Same, with per-dimension usage caps (`("300x250", 2)` style).
    pub fn with_creatives_and_caps(names: &[&str], caps: &[(&str, u32)]) -> Self {
        let creatives_dir = fixtures::creative_folder(names);
        let shots_dir = TempDir::new().expect("screenshot tempdir");
        let config = fixtures::test_config(creatives_dir.path(), shots_dir.path());

        let creatives = inventory::load_creatives(creatives_dir.path()).expect("load creatives");
        let caps: HashMap<Dimension, u32> = caps
            .iter()
            .map(|(k, v)| (k.parse::<Dimension>().expect("cap key"), *v))
            .collect();
        let policy = RotationPolicy::new(creatives, caps);

        Self {
            browser: MockBrowser::default(),
            capture: MockCapture::new(),
            config,
            creatives_dir,
            shots_dir,
            policy,
        }
    }

    /// Assemble the orchestrator, keeping clones of the mocks for
    /// inspection.
    pub fn assemble(self) -> Assembled {
        let store = ScreenshotStore::new(self.shots_dir.path()).expect("screenshot store");
        let browser = self.browser.clone();
        let capture = self.capture.clone();
        let orchestrator =
            Orchestrator::new(self.browser, self.capture, self.policy, store, self.config)
                .expect("orchestrator setup");
        Assembled {
            orchestrator,
            browser,
            capture,
            shots_dir: self.shots_dir,
            creatives_dir: self.creatives_dir,
        }
    }
}

/// Page URLs as owned strings.
pub fn pages(urls: &[&str]) -> Vec<String> {
    urls.iter().map(|u| u.to_string()).collect()
}
