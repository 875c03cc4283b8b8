//! Core types shared across all adswap crates.
//!
//! Defines the configuration record, error taxonomy, geometry primitives,
//! replacement records, and session state used by the engine, browser
//! driver, and CLI.

pub mod config;
pub mod error;
pub mod geom;
pub mod record;
pub mod session;

pub use config::{AdSwapConfig, ButtonStyle, CONFIG_FILENAME};
pub use error::SwapError;
pub use geom::{Dimension, Region};
pub use record::{ReplacementRecord, SessionOutcome, SessionReport};
pub use session::SessionState;
