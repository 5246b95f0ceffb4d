//! Work queue between whoever finds new screenshots and the capture worker.
//!
//! Uses a std::sync::mpsc channel. Items queue up while the vision model is busy.

use std::path::PathBuf;
use std::sync::mpsc::{channel, Receiver, Sender};

use chrono::{DateTime, Local};

use crate::scoring::ScoringMode;

/// One screenshot waiting to be read.
#[derive(Debug, Clone)]
pub struct CaptureWorkItem {
    pub image_path: PathBuf,
    /// How the screen is folded into the ledger
    pub mode: ScoringMode,
    pub captured_at: DateTime<Local>,
}

impl CaptureWorkItem {
    pub fn new(image_path: PathBuf, mode: ScoringMode) -> Self {
        Self {
            image_path,
            mode,
            captured_at: Local::now(),
        }
    }
}

/// Creates a new work queue. The channel closes when every sender is dropped.
pub fn create_work_queue() -> (Sender<CaptureWorkItem>, Receiver<CaptureWorkItem>) {
    channel()
}
