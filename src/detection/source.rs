//! Detector interface.
//!
//! The object detector is an externally trained model; the pipeline only
//! consumes its output. [`DetectionFile`] reads that output from the JSON
//! file the model runner writes next to each screenshot.

use anyhow::{Context, Result};
use image::DynamicImage;
use std::fs;
use std::path::{Path, PathBuf};

use super::region::RawDetection;

/// Anything that can locate result-screen regions in an image.
pub trait Detector: Send + Sync {
    /// Returns every detected region. Labels may repeat; may be empty.
    fn detect(&self, image: &DynamicImage) -> Result<Vec<RawDetection>>;
}

/// Detections precomputed by the external model, stored as a JSON array of
/// `{ "label": ..., "bbox": [x0, y0, x1, y1], "confidence": ... }`.
#[derive(Debug, Clone)]
pub struct DetectionFile {
    path: PathBuf,
}

impl DetectionFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The detection file expected next to a screenshot: `<stem>.json`.
    pub fn beside(image_path: &Path) -> Self {
        Self::new(image_path.with_extension("json"))
    }
}

impl Detector for DetectionFile {
    fn detect(&self, _image: &DynamicImage) -> Result<Vec<RawDetection>> {
        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read detections: {}", self.path.display()))?;
        let detections: Vec<RawDetection> = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse detections: {}", self.path.display()))?;
        log::debug!(
            "Loaded {} detections from {}",
            detections.len(),
            self.path.display()
        );
        Ok(detections)
    }
}
