//! Capture worker thread.
//!
//! Receives screenshot paths from the work queue, asks the vision model to
//! read them, and folds the result into the ledger. A screenshot that cannot
//! be read is skipped; the worker keeps going.

use std::path::PathBuf;
use std::sync::mpsc::Receiver;
use std::sync::Arc;

use log::{debug, error, info, warn};

use super::queue::CaptureWorkItem;
use crate::history::append_batch;
use crate::overlay::OverlayTarget;
use crate::scoring::{ScoreLedgerService, TeamGrouping};
use crate::store::LedgerStore;
use crate::vision::{CapturedImage, VisionExtractor};

/// Everything the worker needs, moved into its thread.
pub struct CaptureContext<S: LedgerStore> {
    pub service: Arc<ScoreLedgerService<S>>,
    pub extractor: Box<dyn VisionExtractor>,
    pub grouping: TeamGrouping,
    pub max_image_side: u32,
    pub history_path: Option<PathBuf>,
    pub overlay: Option<OverlayTarget>,
}

/// Counts reported when the queue closes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerSummary {
    /// Screenshots that changed the ledger
    pub applied: usize,
    /// The model reported it could not read the screen
    pub skipped: usize,
    /// Load, validation or persistence failures
    pub failed: usize,
}

/// Runs the worker loop until every sender is dropped.
///
/// Blocks, so it should be run in a dedicated thread.
pub fn run_capture_worker<S: LedgerStore>(
    receiver: Receiver<CaptureWorkItem>,
    ctx: CaptureContext<S>,
) -> WorkerSummary {
    info!("Capture worker started");
    let mut summary = WorkerSummary::default();

    while let Ok(item) = receiver.recv() {
        info!(
            "Capture worker: reading {} as {} ({})",
            item.image_path.display(),
            item.mode,
            item.captured_at.format("%H:%M:%S")
        );

        let image = match CapturedImage::load(&item.image_path, ctx.max_image_side) {
            Ok(image) => image,
            Err(e) => {
                warn!("Capture worker: {:#}", e);
                summary.failed += 1;
                continue;
            }
        };

        debug!("Capture worker: uploading {}x{} PNG", image.width, image.height);
        let extraction = ctx.extractor.extract(&image, item.mode);
        let mutation = match ctx
            .service
            .apply_extraction(extraction, item.mode, ctx.grouping)
        {
            Ok(Some(mutation)) => mutation,
            Ok(None) => {
                summary.skipped += 1;
                continue;
            }
            Err(e) => {
                error!(
                    "Capture worker: {} not applied: {}",
                    item.image_path.display(),
                    e
                );
                summary.failed += 1;
                continue;
            }
        };
        summary.applied += 1;

        for event in &mutation.events {
            info!("  {} {:?}", event.team, event.kind);
        }

        if let Some(path) = &ctx.history_path {
            if let Err(e) = append_batch(path, item.mode, &mutation, item.captured_at) {
                warn!("Capture worker: failed to write history: {:#}", e);
            }
        }
        if let Some(overlay) = &ctx.overlay {
            if let Err(e) = overlay.publish(mutation.next.entries()) {
                warn!("Capture worker: failed to update overlay: {:#}", e);
            }
        }
    }

    info!(
        "Capture worker finished: {} applied, {} skipped, {} failed",
        summary.applied, summary.skipped, summary.failed
    );
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::queue::create_work_queue;
    use crate::history::init_history;
    use crate::overlay::OverlayStyle;
    use crate::scoring::ScoringMode;
    use crate::store::memory::MemoryLedgerStore;
    use crate::vision::Extraction;
    use image::RgbaImage;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::thread;
    use tempfile::tempdir;

    /// Returns canned extractions in order.
    struct ScriptedExtractor(Mutex<VecDeque<Extraction>>);

    impl ScriptedExtractor {
        fn new(replies: Vec<Extraction>) -> Box<Self> {
            Box::new(Self(Mutex::new(replies.into())))
        }
    }

    impl VisionExtractor for ScriptedExtractor {
        fn extract(&self, _image: &CapturedImage, _mode: ScoringMode) -> Extraction {
            self.0
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Extraction::Failed("no more replies".to_string()))
        }
    }

    fn context(
        extractor: Box<dyn VisionExtractor>,
        history_path: Option<PathBuf>,
        overlay: Option<OverlayTarget>,
    ) -> CaptureContext<MemoryLedgerStore> {
        CaptureContext {
            service: Arc::new(ScoreLedgerService::open(MemoryLedgerStore::default()).unwrap()),
            extractor,
            grouping: TeamGrouping::Supplied,
            max_image_side: 0,
            history_path,
            overlay,
        }
    }

    #[test]
    fn test_worker_exits_when_channel_closes() {
        let (sender, receiver) = create_work_queue();
        let ctx = context(ScriptedExtractor::new(vec![]), None, None);

        let handle = thread::spawn(move || run_capture_worker(receiver, ctx));
        drop(sender);

        assert_eq!(handle.join().unwrap(), WorkerSummary::default());
    }

    #[test]
    fn test_worker_applies_and_skips() {
        let dir = tempdir().unwrap();
        let image_path = dir.path().join("race.png");
        RgbaImage::new(4, 4).save(&image_path).unwrap();
        let history_path = dir.path().join("history.csv");
        init_history(&history_path).unwrap();
        let overlay_path = dir.path().join("overlay.txt");

        let extractor = ScriptedExtractor::new(vec![
            Extraction::Records(vec![
                json!({"rank": 1, "name": "a", "team": "X"}),
                json!({"rank": 2, "name": "b", "team": "Y", "isCurrentPlayer": true}),
            ]),
            Extraction::Failed("loading screen".to_string()),
            Extraction::Records(vec![json!({"rank": 1, "name": "c"})]),
        ]);
        let overlay = OverlayTarget {
            path: overlay_path.clone(),
            style: OverlayStyle::default(),
        };
        let ctx = context(extractor, Some(history_path.clone()), Some(overlay));
        let service = Arc::clone(&ctx.service);

        let (sender, receiver) = create_work_queue();
        for _ in 0..3 {
            sender
                .send(CaptureWorkItem::new(image_path.clone(), ScoringMode::Race))
                .unwrap();
        }
        sender
            .send(CaptureWorkItem::new(dir.path().join("missing.png"), ScoringMode::Race))
            .unwrap();
        drop(sender);

        let summary = run_capture_worker(receiver, ctx);
        assert_eq!(
            summary,
            WorkerSummary {
                applied: 1,
                skipped: 1,
                failed: 2,
            }
        );

        let snapshot = service.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].score, 15);

        let history = std::fs::read_to_string(&history_path).unwrap();
        assert_eq!(history.lines().count(), 3);

        let overlay = std::fs::read_to_string(&overlay_path).unwrap();
        assert!(overlay.contains("X"));
        assert!(overlay.contains("<<"));
    }
}
