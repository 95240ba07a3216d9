//! Detection scoring.
//!
//! - `matrix`: ground-truth TP/FP/FN accumulation with IoU matching
//! - `summary`: run-level statistics over frames with sightings

pub mod matrix;
pub mod summary;

pub use matrix::{
    ClassCounts, ClassMetrics, DetectionMatrix, LabeledBox, MatchStrategy, DEFAULT_IOU_THRESHOLD,
    RATE_EPSILON,
};
pub use summary::{SummaryStatistics, PLACEHOLDER_RECALL};

/// Round half away from zero to `places` decimals.
pub(crate) fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// Decimal places kept for a confidence once it is recorded.
pub const CONFIDENCE_PLACES: i32 = 2;

/// A detector score as it appears in results: rounded to
/// `CONFIDENCE_PLACES`, widened without binary noise (0.9f32 reports as 0.9).
pub fn recorded_confidence(confidence: f32) -> f64 {
    round_to(confidence as f64, CONFIDENCE_PLACES)
}
