//! Failures surfaced by the recognition pipeline.

use thiserror::Error;

use crate::detection::CanonicalClass;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// Fewer distinct classes were detected than the configured minimum.
    #[error("not enough detect data: found {found} classes, need {required}")]
    InsufficientDetections { found: usize, required: usize },

    /// A field's accumulated text could not be normalized.
    #[error("malformed {0} field in OCR output")]
    MalformedField(CanonicalClass),

    /// Transport failure, timeout or non-2xx reply from the OCR service.
    #[error("OCR service error: {0}")]
    OcrService(String),

    /// The OCR reply lacks the `images[].fields[].inferText` structure.
    #[error("malformed OCR response: {0}")]
    MalformedOcrResponse(String),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type PipelineResult<T> = Result<T, PipelineError>;
