//! Test doubles for exercising the adswap engine without a browser.
//!
//! - [`MockBrowser`]: implements the engine's `Browser` trait over an
//!   in-memory page model, with scriptable navigation failures, reflow
//!   races, and mutation refusals.
//! - [`MockCapture`]: implements `CaptureGateway` with scripted failures
//!   and call recording.
//! - [`fixtures`]: temp creative folders and ready-made configs.
//!
//! All mocks use `Arc<Mutex<_>>` interior mutability and are cheaply
//! cloneable, so a test can hand one clone to the orchestrator and keep
//! another for inspection.

pub mod fixtures;
pub mod mocks;

pub use mocks::{MockBrowser, MockBrowserBuilder, MockCapture, MockElement};
