//! Detector output handling.
//!
//! This module provides:
//! - Canonical class names and synonym normalization for detector labels
//! - Consolidation of overlapping detections into one region per class
//! - The detector interface and a JSON-file backed implementation

pub mod consolidate;
pub mod region;
pub mod source;

pub use consolidate::{consolidate, Consolidated};
pub use region::{CanonicalClass, DetectedRegion};
pub use source::{DetectionFile, Detector};
