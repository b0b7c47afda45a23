//! Composite image assembly.
//!
//! Crops every consolidated region out of the screenshot and stacks the
//! crops into one labelled image, so a single OCR request covers all fields.

pub mod crop;
pub mod merge;

pub use crop::{crop_regions, orient_portrait};
pub use merge::{calc_size, encode_jpeg, merge, save_encoded, LabelStyle};

use image::RgbImage;

use crate::detection::{CanonicalClass, Consolidated};

/// Crops all regions and stacks them under label headers.
pub fn composite(source: &RgbImage, regions: &Consolidated, style: &LabelStyle) -> RgbImage {
    let crops: Vec<(CanonicalClass, RgbImage)> = crop_regions(source, regions);
    let layout = calc_size(&crops, style.height);
    log::info!(
        "Composite of {} regions: {}x{}",
        crops.len(),
        layout.width,
        layout.height
    );
    merge(&crops, layout, style)
}
