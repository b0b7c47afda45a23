use image::{DynamicImage, RgbImage};

use crate::detection::{CanonicalClass, Consolidated, DetectedRegion};

/// Rotates landscape screenshots a quarter turn clockwise.
///
/// Result screens are portrait; a landscape upload is a phone photo taken
/// sideways.
pub fn orient_portrait(img: DynamicImage) -> DynamicImage {
    if img.width() > img.height() {
        log::debug!("Rotating landscape upload {}x{}", img.width(), img.height());
        img.rotate90()
    } else {
        img
    }
}

/// Crops one detected region out of the source image.
///
/// The title box also covers the artist line below it, so only its upper
/// half is kept. Parts of the box outside the image are black.
pub fn cut(source: &RgbImage, region: &DetectedRegion) -> RgbImage {
    let bounds = match region.label {
        CanonicalClass::Title => region.bounds.upper_half(),
        _ => region.bounds,
    };
    let (x, y, w, h) = bounds.to_pixel_rect();
    let mut crop = RgbImage::new(w, h);
    image::imageops::overlay(&mut crop, source, -x, -y);
    crop
}

/// Crops every consolidated region, preserving consolidation order.
pub fn crop_regions(source: &RgbImage, regions: &Consolidated) -> Vec<(CanonicalClass, RgbImage)> {
    regions
        .iter()
        .map(|region| (region.label, cut(source, region)))
        .collect()
}
