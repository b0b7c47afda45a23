//! Screenshot → structured records.
//!
//! Orients the upload, consolidates the detector's regions, rejects
//! screenshots with too few regions, composites the rest, sends the
//! composite to OCR and segments the reply.

use anyhow::{Context, Result};
use image::DynamicImage;
use std::path::PathBuf;
use std::sync::Arc;

use crate::composite::{self, LabelStyle};
use crate::detection::{consolidate, Detector};
use crate::error::PipelineError;
use crate::ocr::{recognize_records, OcrService, StructuredRecord, Vocabulary};
use crate::upload::StoredUpload;

/// Everything one upload needs; shared read-only between workers.
pub struct PipelineContext {
    pub vocabulary: Arc<Vocabulary>,
    pub ocr: Arc<dyn OcrService>,
    pub style: Arc<LabelStyle>,
    pub min_detected_classes: usize,
    /// Where composites are kept for auditing
    pub ocr_ready_dir: Option<PathBuf>,
}

impl PipelineContext {
    /// Runs the whole pipeline on an already-loaded screenshot.
    pub fn process_image(
        &self,
        image: DynamicImage,
        detector: &dyn Detector,
        name: &str,
    ) -> Result<Vec<StructuredRecord>> {
        let image = composite::orient_portrait(image);

        let detections = detector.detect(&image)?;
        let regions = consolidate(&detections);
        log::info!(
            "{}: {} detections, classes {:?}",
            name,
            detections.len(),
            regions.classes()
        );
        regions.ensure_min_classes(self.min_detected_classes)?;

        let merged = composite::composite(&image.to_rgb8(), &regions, &self.style);
        let jpeg = composite::encode_jpeg(&merged)?;
        if let Some(dir) = &self.ocr_ready_dir {
            composite::save_encoded(&jpeg, &dir.join(format!("{}.jpg", name)))?;
        }

        let records = recognize_records(self.ocr.as_ref(), &jpeg, name, &self.vocabulary)?;
        Ok(records)
    }

    /// Runs the pipeline on a stored upload. A rejected upload (too few
    /// detected regions) has its stored copy removed.
    pub fn process_upload(
        &self,
        upload: &StoredUpload,
        detector: &dyn Detector,
    ) -> Result<Vec<StructuredRecord>> {
        let image = image::open(&upload.path)
            .with_context(|| format!("Failed to load {}", upload.path.display()))?;

        let result = self.process_image(image, detector, &upload.name);
        if let Err(e) = &result
            && let Some(PipelineError::InsufficientDetections { found, required }) =
                e.downcast_ref::<PipelineError>()
        {
            log::warn!(
                "Rejecting {}: {} of {} required classes detected",
                upload.name,
                found,
                required
            );
            upload.remove();
        }
        result
    }
}
