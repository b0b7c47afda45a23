use ab_glyph::{FontVec, PxScale};
use anyhow::{anyhow, Result};
use image::{ImageFormat, Rgb, RgbImage};
use imageproc::drawing::draw_text_mut;
use std::io::Cursor;
use std::path::Path;

use crate::detection::CanonicalClass;
use crate::error::PipelineResult;

const BLACK: Rgb<u8> = Rgb([0, 0, 0]);
const WHITE: Rgb<u8> = Rgb([255, 255, 255]);

/// Size of the stacked composite canvas.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CompositeLayout {
    pub width: u32,
    pub height: u32,
}

/// How the label header above each crop is drawn.
pub struct LabelStyle {
    /// Header height in pixels
    pub height: u32,
    /// Text size in pixels
    pub font_size: f32,
    /// Left inset of the text
    pub margin: i32,
    /// Header font. Only tests build a style without one; the OCR reply
    /// cannot be segmented when the headers are blank.
    pub font: Option<FontVec>,
}

impl LabelStyle {
    /// Builds the style from config, failing when no usable font is found.
    pub fn from_config(config: &crate::config::AppConfig) -> Result<Self> {
        Self::with_font(config, load_font(config.font_path.as_deref()))
    }

    fn with_font(config: &crate::config::AppConfig, font: Option<FontVec>) -> Result<Self> {
        let font = font.ok_or_else(|| {
            anyhow!(
                "No label font found (configured: {:?}); set font_path to a TrueType font",
                config.font_path
            )
        })?;
        Ok(Self {
            height: config.label_height,
            font_size: config.label_font_size,
            margin: config.label_margin,
            font: Some(font),
        })
    }
}

/// Loads the configured font, falling back to common system fonts.
pub fn load_font(configured: Option<&str>) -> Option<FontVec> {
    let font_paths = [
        "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
        "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
        "/System/Library/Fonts/Arial.ttf",
        "C:\\Windows\\Fonts\\arial.ttf",
    ];

    for path in configured.into_iter().chain(font_paths) {
        if let Ok(font_data) = std::fs::read(path)
            && let Ok(font) = FontVec::try_from_vec(font_data)
        {
            log::debug!("Label font loaded from {}", path);
            return Some(font);
        }
    }

    None
}

/// Computes the composite size: the widest crop by the sum of
/// `crop height + label height` over all crops.
pub fn calc_size(crops: &[(CanonicalClass, RgbImage)], label_height: u32) -> CompositeLayout {
    let width = crops.iter().map(|(_, img)| img.width()).max().unwrap_or(0);
    let height = crops.iter().map(|(_, img)| img.height() + label_height).sum();
    CompositeLayout { width, height }
}

/// Renders a header strip naming the region below it.
fn new_label(label: CanonicalClass, width: u32, style: &LabelStyle) -> RgbImage {
    let mut header = RgbImage::from_pixel(width, style.height, BLACK);
    if let Some(font) = &style.font {
        draw_text_mut(
            &mut header,
            WHITE,
            style.margin,
            0,
            PxScale::from(style.font_size),
            font,
            label.as_str(),
        );
    }
    header
}

/// Stacks header + crop blocks top to bottom with no gaps.
pub fn merge(
    crops: &[(CanonicalClass, RgbImage)],
    layout: CompositeLayout,
    style: &LabelStyle,
) -> RgbImage {
    let mut canvas = RgbImage::from_pixel(layout.width, layout.height, BLACK);
    let mut current_height: i64 = 0;

    for (label, crop) in crops {
        let header = new_label(*label, layout.width, style);
        image::imageops::overlay(&mut canvas, &header, 0, current_height);
        image::imageops::overlay(&mut canvas, crop, 0, current_height + style.height as i64);
        current_height += (crop.height() + style.height) as i64;
    }

    canvas
}

/// Encodes the composite for transmission.
pub fn encode_jpeg(image: &RgbImage) -> PipelineResult<Vec<u8>> {
    let mut bytes = Vec::new();
    image.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Jpeg)?;
    Ok(bytes)
}

/// Writes already-encoded composite bytes for later inspection.
pub fn save_encoded(bytes: &[u8], path: &Path) -> PipelineResult<()> {
    std::fs::write(path, bytes)?;
    Ok(())
}
