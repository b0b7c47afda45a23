pub mod client;
pub mod fields;
pub mod matcher;
pub mod normalize;
pub mod segment;
pub mod vocabulary;

pub use client::{GeneralOcrClient, OcrService};
pub use fields::StructuredRecord;
pub use segment::segment_images;
pub use vocabulary::Vocabulary;

use crate::error::PipelineResult;

/// High-level function: composite JPEG → one structured record per image
/// in the OCR reply.
pub fn recognize_records(
    service: &dyn OcrService,
    jpeg: &[u8],
    name: &str,
    vocab: &Vocabulary,
) -> PipelineResult<Vec<StructuredRecord>> {
    let response = service.recognize(jpeg, name)?;
    let images = response.fragments();
    for (idx, fragments) in images.iter().enumerate() {
        log::info!("OCR image {}: {} fragments", idx + 1, fragments.len());
    }

    let records = segment_images(&images, vocab)?;
    for record in &records {
        log::info!("Recognized {}", serde_json::to_string(record)?);
    }
    Ok(records)
}
