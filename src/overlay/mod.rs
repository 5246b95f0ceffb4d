//! Presentation for the streaming overlay.
//!
//! This module provides:
//! - Plain-text rendering of the ledger for a text source (`render`)
//! - A polling watcher that turns store changes into diff events (`watch`)

pub mod render;
pub mod watch;

pub use render::{render_text, OverlayStyle, OverlayTarget};
pub use watch::LedgerWatcher;
