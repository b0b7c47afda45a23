//! Upload worker threads.
//!
//! Each worker pulls items from the shared queue, stores the screenshot,
//! runs the full pipeline on it and reports the outcome. A failed item is
//! logged and reported; the worker moves on to the next one.

use std::path::{Path, PathBuf};
use std::sync::mpsc::{Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use super::queue::{UploadItem, UploadOutcome};
use crate::detection::DetectionFile;
use crate::pipeline::PipelineContext;
use crate::upload::store_upload;

fn process_item(ctx: &PipelineContext, item: UploadItem, upload_dir: &Path) -> UploadOutcome {
    let upload = match store_upload(&item.image_path, upload_dir) {
        Ok(upload) => upload,
        Err(e) => {
            return UploadOutcome {
                item,
                upload_name: None,
                result: Err(e),
            };
        }
    };

    let detector = DetectionFile::new(&item.detections_path);
    let result = ctx.process_upload(&upload, &detector);
    UploadOutcome {
        item,
        upload_name: Some(upload.name),
        result,
    }
}

/// Runs one worker loop until the work queue closes.
///
/// Blocks, so it should run on its own thread.
pub fn run_upload_worker(
    id: usize,
    receiver: Arc<Mutex<Receiver<UploadItem>>>,
    outcomes: Sender<UploadOutcome>,
    ctx: Arc<PipelineContext>,
    upload_dir: PathBuf,
) {
    log::info!("Upload worker {} started", id);

    loop {
        let next = match receiver.lock() {
            Ok(guard) => guard.recv(),
            Err(_) => {
                log::error!("Upload worker {}: queue lock poisoned, exiting", id);
                break;
            }
        };
        let Ok(item) = next else {
            log::debug!("Upload worker {}: channel closed, exiting", id);
            break;
        };

        log::info!(
            "Upload worker {}: processing #{} ({})",
            id,
            item.sequence,
            item.image_path.display()
        );

        let outcome = process_item(&ctx, item, &upload_dir);
        if let Err(e) = &outcome.result {
            log::warn!(
                "Upload worker {}: #{} failed: {:#}",
                id,
                outcome.item.sequence,
                e
            );
        }

        if outcomes.send(outcome).is_err() {
            log::warn!("Upload worker {}: outcome receiver dropped, exiting", id);
            break;
        }
    }

    log::info!("Upload worker {} finished", id);
}

/// Spawns `count` workers sharing one queue. Drop the returned sender's
/// clones and the workers exit once the queue drains.
pub fn start_workers(
    count: usize,
    receiver: Receiver<UploadItem>,
    outcomes: Sender<UploadOutcome>,
    ctx: Arc<PipelineContext>,
    upload_dir: PathBuf,
) -> Vec<JoinHandle<()>> {
    let receiver = Arc::new(Mutex::new(receiver));
    (1..=count.max(1))
        .map(|id| {
            let receiver = Arc::clone(&receiver);
            let outcomes = outcomes.clone();
            let ctx = Arc::clone(&ctx);
            let upload_dir = upload_dir.clone();
            thread::spawn(move || run_upload_worker(id, receiver, outcomes, ctx, upload_dir))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composite::LabelStyle;
    use crate::error::PipelineResult;
    use crate::ocr::client::{parse_response, OcrResponse};
    use crate::ocr::{OcrService, Vocabulary};
    use crate::worker::queue::{create_outcome_queue, create_work_queue};
    use image::RgbImage;
    use tempfile::tempdir;

    struct ScoreOnlyOcr;

    impl OcrService for ScoreOnlyOcr {
        fn recognize(&self, _jpeg: &[u8], _name: &str) -> PipelineResult<OcrResponse> {
            parse_response(
                r#"{"images": [{"fields": [{"inferText": "score"}, {"inferText": "0777"}]}]}"#,
            )
        }
    }

    fn context() -> Arc<PipelineContext> {
        Arc::new(PipelineContext {
            vocabulary: Arc::new(Vocabulary::new(Vec::new())),
            ocr: Arc::new(ScoreOnlyOcr),
            style: Arc::new(LabelStyle { height: 40, font_size: 20.0, margin: 10, font: None }),
            min_detected_classes: 1,
            ocr_ready_dir: None,
        })
    }

    fn write_screenshot(dir: &Path, stem: &str) -> UploadItem {
        let image_path = dir.join(format!("{}.png", stem));
        RgbImage::new(40, 80).save(&image_path).unwrap();
        let detections_path = dir.join(format!("{}.json", stem));
        std::fs::write(
            &detections_path,
            r#"[{"label": "score", "bbox": [0, 0, 30, 20], "confidence": 0.9}]"#,
        )
        .unwrap();
        UploadItem::new(image_path, detections_path, 0)
    }

    #[test]
    fn test_workers_exit_when_channel_closes() {
        let dir = tempdir().unwrap();
        let (sender, receiver) = create_work_queue();
        let (outcome_tx, _outcome_rx) = create_outcome_queue();

        let handles = start_workers(2, receiver, outcome_tx, context(), dir.path().to_path_buf());
        drop(sender);

        for handle in handles {
            handle.join().expect("Worker thread panicked");
        }
    }

    #[test]
    fn test_batch_reports_every_item() {
        let dir = tempdir().unwrap();
        let upload_dir = dir.path().join("uploads");
        std::fs::create_dir_all(&upload_dir).unwrap();

        let (sender, receiver) = create_work_queue();
        let (outcome_tx, outcome_rx) = create_outcome_queue();
        let handles = start_workers(2, receiver, outcome_tx, context(), upload_dir.clone());

        let mut good = write_screenshot(dir.path(), "good");
        good.sequence = 1;
        sender.send(good).unwrap();

        // missing detections file: fails without stopping the batch
        let mut broken = write_screenshot(dir.path(), "broken");
        std::fs::remove_file(&broken.detections_path).unwrap();
        broken.sequence = 2;
        sender.send(broken).unwrap();

        drop(sender);
        let mut outcomes: Vec<UploadOutcome> = outcome_rx.iter().collect();
        for handle in handles {
            handle.join().unwrap();
        }

        outcomes.sort_by_key(|o| o.item.sequence);
        assert_eq!(outcomes.len(), 2);

        let records = outcomes[0].result.as_ref().unwrap();
        assert_eq!(records[0].score.as_deref(), Some("777"));
        assert!(outcomes[0].upload_name.is_some());

        assert!(outcomes[1].result.is_err());
        assert!(outcomes[1].upload_name.is_some());
    }

    #[test]
    fn test_unreadable_upload_reported() {
        let dir = tempdir().unwrap();
        let ctx = context();
        let source = dir.path().join("notes.txt");
        std::fs::write(&source, "not an image").unwrap();

        let item = UploadItem::new(source, dir.path().join("notes.json"), 7);
        let outcome = process_item(&ctx, item, dir.path());
        assert_eq!(outcome.item.sequence, 7);
        assert!(outcome.upload_name.is_none());
        assert!(outcome.result.is_err());
    }
}
