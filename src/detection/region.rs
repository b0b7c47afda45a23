use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the six result-screen regions the pipeline understands.
///
/// Declaration order is the order used for field-boundary matching.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CanonicalClass {
    Difficulty,
    Result,
    Score,
    Detail,
    Rate,
    Title,
}

impl CanonicalClass {
    pub const ALL: [CanonicalClass; 6] = [
        CanonicalClass::Difficulty,
        CanonicalClass::Result,
        CanonicalClass::Score,
        CanonicalClass::Detail,
        CanonicalClass::Rate,
        CanonicalClass::Title,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CanonicalClass::Difficulty => "difficulty",
            CanonicalClass::Result => "result",
            CanonicalClass::Score => "score",
            CanonicalClass::Detail => "detail",
            CanonicalClass::Rate => "rate",
            CanonicalClass::Title => "title",
        }
    }

    /// Exact lookup by canonical name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == name)
    }

    /// Position in [`CanonicalClass::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for CanonicalClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Maps a raw detector label to its canonical class.
///
/// Compound labels are folded into a single word so that the OCR label
/// header is read back as one fragment. Returns `None` for `scoreboard`
/// (the whole result panel, never useful on its own) and for labels the
/// model should not produce.
pub fn canonicalize(raw_label: &str) -> Option<CanonicalClass> {
    match raw_label {
        "result_perfect" | "UC" => Some(CanonicalClass::Result),
        "score_detail" => Some(CanonicalClass::Detail),
        "score_perfect" => Some(CanonicalClass::Score),
        "score_rate" => Some(CanonicalClass::Rate),
        "scoreboard" => None,
        other => CanonicalClass::from_name(other),
    }
}

/// Axis-aligned box in source-image pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl Bounds {
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    /// Keeps only the upper half of the box.
    ///
    /// The new bottom is `floor((y0 + y1) / 2)`.
    pub fn upper_half(self) -> Self {
        Self {
            y1: ((self.y0 + self.y1) / 2.0).floor(),
            ..self
        }
    }

    /// Rounds to integer pixel coordinates. Returns `(x, y, w, h)`; the
    /// origin may lie outside the image. An inverted box has zero size.
    pub fn to_pixel_rect(self) -> (i64, i64, u32, u32) {
        let x0 = self.x0.round() as i64;
        let y0 = self.y0.round() as i64;
        let x1 = (self.x1.round() as i64).max(x0);
        let y1 = (self.y1.round() as i64).max(y0);
        (x0, y0, (x1 - x0) as u32, (y1 - y0) as u32)
    }
}

/// A detection exactly as the detector reported it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RawDetection {
    pub label: String,
    #[serde(rename = "bbox")]
    pub bounds: [f32; 4],
    pub confidence: f32,
}

/// A detection after label canonicalization.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DetectedRegion {
    pub label: CanonicalClass,
    pub bounds: Bounds,
    pub confidence: f32,
}
