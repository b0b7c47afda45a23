//! Channels between the batch driver and the upload workers.
//!
//! Items flow out on one channel, outcomes come back on another. Both are
//! unbounded; a slow OCR service just lets items queue up.

use std::path::PathBuf;
use std::sync::mpsc::{channel, Receiver, Sender};

use crate::ocr::StructuredRecord;

/// One screenshot to process.
#[derive(Debug, Clone)]
pub struct UploadItem {
    pub image_path: PathBuf,
    /// Detector output for this screenshot
    pub detections_path: PathBuf,
    /// Position in the batch (1-based)
    pub sequence: u32,
}

impl UploadItem {
    pub fn new(image_path: PathBuf, detections_path: PathBuf, sequence: u32) -> Self {
        Self {
            image_path,
            detections_path,
            sequence,
        }
    }
}

/// What became of one item.
#[derive(Debug)]
pub struct UploadOutcome {
    pub item: UploadItem,
    /// Name the upload was stored under, if it got that far
    pub upload_name: Option<String>,
    pub result: anyhow::Result<Vec<StructuredRecord>>,
}

pub fn create_work_queue() -> (Sender<UploadItem>, Receiver<UploadItem>) {
    channel()
}

pub fn create_outcome_queue() -> (Sender<UploadOutcome>, Receiver<UploadOutcome>) {
    channel()
}
