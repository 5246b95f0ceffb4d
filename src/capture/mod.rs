//! Screenshot pipeline feeding the vision model and the ledger.
//!
//! This module provides:
//! - The work queue (`CaptureWorkItem`, `create_work_queue`)
//! - The worker loop (`run_capture_worker`)

pub mod queue;
pub mod worker;

pub use queue::{create_work_queue, CaptureWorkItem};
pub use worker::{run_capture_worker, CaptureContext};
