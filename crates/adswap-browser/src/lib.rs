//! CDP (Chrome DevTools Protocol) page driver for adswap.
//!
//! Attaches to a running Chrome/Chromium instance over its DevTools
//! WebSocket endpoint and exposes the small capability surface the
//! replacement engine needs:
//!
//! - Navigate to URLs (`Page.navigate`) and wait for the load event
//! - Execute page functions with JSON arguments (`Runtime.evaluate`)
//! - Take viewport and clip-region screenshots (`Page.captureScreenshot`)
//! - Scroll the page
//! - Discover attachable page targets via the DevTools `/json` endpoint
//!
//! # Architecture
//!
//! - **`cdp`**: WebSocket client with JSON-RPC 2.0 command/response
//!   correlation and event waiting.
//! - **`driver`**: [`PageDriver`] wrapping the client with the operations
//!   above. All driver methods take `&self`, so a driver can be shared
//!   behind an `Arc` between the engine's browser and capture backends.
//! - **`discovery`**: target listing and selection against
//!   `http://host:port/json`.
//!
//! Chrome must be started with `--remote-debugging-port`:
//!
//! ```sh
//! google-chrome --remote-debugging-port=9222
//! ```

pub mod cdp;
pub mod discovery;
pub mod driver;
pub mod error;

pub use cdp::CdpClient;
pub use discovery::{list_targets, pick_page_target, DevToolsTarget};
pub use driver::PageDriver;
pub use error::BrowserError;
