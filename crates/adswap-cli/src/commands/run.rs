//! The `run` subcommand: attach, collect candidate pages, drive a session.

use std::sync::Arc;

use tracing::info;

use adswap_browser::{list_targets, pick_page_target, PageDriver};
use adswap_engine::{
    inventory, CdpBrowser, CdpCapture, Orchestrator, RotationPolicy, ScreenshotStore,
};
use adswap_types::{AdSwapConfig, SessionReport, SwapError};

use crate::pages;

pub async fn execute(config: AdSwapConfig) -> Result<(), SwapError> {
    // Everything needed before the first page is setup; failures here are
    // fatal and exit 1.
    let creatives = inventory::load_creatives(&config.creative_folder)?;
    let creatives: Vec<_> = creatives
        .into_iter()
        .filter(|c| {
            let recognized =
                config.ad_sizes.is_empty() || config.ad_sizes.contains(&c.dimension);
            if !recognized {
                tracing::warn!(
                    creative = %c.id,
                    dimension = %c.dimension,
                    "dimension not in the ad-size table, skipping"
                );
            }
            recognized
        })
        .collect();
    if creatives.is_empty() {
        return Err(SwapError::Setup(
            "no creative matches the configured ad-size table".into(),
        ));
    }
    let policy = RotationPolicy::new(creatives, config.parsed_usage_caps());
    let store = ScreenshotStore::new(&config.screenshot_folder)?;

    let targets = list_targets(&config.devtools_url)
        .await
        .map_err(|e| SwapError::Setup(format!("browser unavailable: {e}")))?;
    let target = pick_page_target(&targets)
        .ok_or_else(|| SwapError::Setup("no attachable page target in the browser".into()))?;
    let ws_url = target
        .ws_url
        .as_deref()
        .ok_or_else(|| SwapError::Setup("page target has no WebSocket URL".into()))?;
    let driver = Arc::new(
        PageDriver::connect(ws_url)
            .await
            .map_err(|e| SwapError::Setup(format!("cannot attach to browser: {e}")))?,
    );
    info!(target = %target.url, "attached to browser");

    let candidates = pages::collect_candidates(&driver, &config).await;
    info!(count = candidates.len(), "candidate pages collected");

    let browser = CdpBrowser::new(Arc::clone(&driver), config.settle());
    let gateway = CdpCapture::new(Arc::clone(&driver));
    let report_path = config.report_path.clone();
    let orchestrator = Orchestrator::new(browser, gateway, policy, store, config)?;

    let report = orchestrator.run(candidates).await?;
    if let Some(path) = report_path {
        write_report(&report, &path)?;
    }
    summarize(&report);
    Ok(())
}

fn write_report(report: &SessionReport, path: &std::path::Path) -> Result<(), SwapError> {
    let json = serde_json::to_string_pretty(report)
        .map_err(|e| SwapError::Capture(format!("serializing report: {e}")))?;
    std::fs::write(path, json)
        .map_err(|e| SwapError::Capture(format!("writing {}: {e}", path.display())))?;
    info!(path = %path.display(), "session report written");
    Ok(())
}

fn summarize(report: &SessionReport) {
    println!(
        "session {}: {} captures over {} pages ({} skipped)",
        report.session_id, report.captures, report.pages_processed, report.pages_skipped
    );
    for record in &report.records {
        println!(
            "  {} {} at {} -> {}",
            record.dimension,
            record.creative_id,
            record.position,
            record.screenshot.display()
        );
    }
}
