//! Reduces the detector's raw boxes to at most one region per class.

use super::region::{canonicalize, Bounds, CanonicalClass, DetectedRegion, RawDetection};
use crate::error::{PipelineError, PipelineResult};

/// Consolidated detections, kept in first-seen class order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Consolidated {
    regions: Vec<DetectedRegion>,
}

impl Consolidated {
    /// Adds a region, replacing an existing one of the same class only if
    /// the new confidence is strictly greater. A replacement keeps the
    /// original position.
    pub fn add(&mut self, region: DetectedRegion) {
        match self.regions.iter_mut().find(|r| r.label == region.label) {
            Some(existing) => {
                if existing.confidence < region.confidence {
                    *existing = region;
                }
            }
            None => self.regions.push(region),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &DetectedRegion> {
        self.regions.iter()
    }

    pub fn classes(&self) -> Vec<CanonicalClass> {
        self.regions.iter().map(|r| r.label).collect()
    }

    /// Fails with `InsufficientDetections` when fewer than `required`
    /// distinct classes survived.
    pub fn ensure_min_classes(&self, required: usize) -> PipelineResult<()> {
        if self.regions.len() < required {
            return Err(PipelineError::InsufficientDetections {
                found: self.regions.len(),
                required,
            });
        }
        Ok(())
    }
}

/// Canonicalizes and deduplicates raw detections.
pub fn consolidate(detections: &[RawDetection]) -> Consolidated {
    let mut consolidated = Consolidated::default();

    for detection in detections {
        let Some(label) = canonicalize(&detection.label) else {
            log::debug!("Ignoring detection '{}'", detection.label);
            continue;
        };
        let [x0, y0, x1, y1] = detection.bounds;
        consolidated.add(DetectedRegion {
            label,
            bounds: Bounds::new(x0, y0, x1, y1),
            confidence: detection.confidence,
        });
    }

    consolidated
}
