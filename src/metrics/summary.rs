//! Run-level summary over frames with sightings.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{recorded_confidence, round_to};
use crate::detect::DetectionCriteria;
use crate::frame::Frame;

/// Stand-in recall reported until ground-truth recall is wired into the
/// summary. Ground-truth runs report real recall in their own block.
pub const PLACEHOLDER_RECALL: f64 = 0.85;

const SECONDS_PER_HOUR: f64 = 3600.0;

/// Aggregate statistics for one run.
///
/// `false_positives` and `precision` here are proxies: a "false positive" is
/// any detection below threshold inside a frame that also has a qualifying
/// sighting. They are not ground-truth counts.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryStatistics {
    pub total_frames: usize,
    pub frames_with_trains: usize,
    /// Percent of sampled frames with a sighting, 2 dp.
    pub detection_rate: f64,
    /// Mean of the recorded (2 dp) qualifying confidences, 2 dp.
    pub avg_confidence: f64,
    pub false_positives: usize,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub duration_seconds: f64,
    /// Frames with sightings per hour of video, 1 dp.
    pub trains_per_hour: f64,
    /// Every detection in frames with a sighting, by label, regardless of score.
    pub object_counts: BTreeMap<String, usize>,
    pub detection_time_seconds: f64,
    pub detection_fps: f64,
}

impl SummaryStatistics {
    /// Aggregate over `frames`. Only frames holding at least one qualifying
    /// detection contribute; others are ignored. Never divides by zero.
    pub fn compute(
        frames: &[Frame],
        total_frames: usize,
        duration_seconds: f64,
        criteria: &DetectionCriteria,
    ) -> Self {
        let sighted: Vec<&Frame> = frames
            .iter()
            .filter(|f| f.detections.iter().any(|d| criteria.qualifies(d)))
            .collect();
        let frames_with_trains = sighted.len();

        let detection_rate = if total_frames > 0 {
            round_to(frames_with_trains as f64 / total_frames as f64 * 100.0, 2)
        } else {
            0.0
        };

        let mut confidences = Vec::new();
        let mut object_counts: BTreeMap<String, usize> = BTreeMap::new();
        let mut false_positives = 0usize;
        for det in sighted.iter().flat_map(|f| f.detections.iter()) {
            *object_counts.entry(det.label.clone()).or_insert(0) += 1;
            if criteria.qualifies(det) {
                confidences.push(recorded_confidence(det.confidence));
            }
            if !criteria.meets_threshold(det) {
                false_positives += 1;
            }
        }

        let avg_confidence = if confidences.is_empty() {
            0.0
        } else {
            round_to(confidences.iter().sum::<f64>() / confidences.len() as f64, 2)
        };

        let trains_per_hour = if duration_seconds > 0.0 {
            round_to(
                frames_with_trains as f64 / (duration_seconds / SECONDS_PER_HOUR),
                1,
            )
        } else {
            0.0
        };

        let denom = frames_with_trains + false_positives;
        let precision = if denom > 0 {
            frames_with_trains as f64 / denom as f64
        } else {
            0.0
        };
        let recall = PLACEHOLDER_RECALL;
        let f1_score = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };

        Self {
            total_frames,
            frames_with_trains,
            detection_rate,
            avg_confidence,
            false_positives,
            precision: round_to(precision, 2),
            recall: round_to(recall, 2),
            f1_score: round_to(f1_score, 2),
            duration_seconds,
            trains_per_hour,
            object_counts,
            detection_time_seconds: 0.0,
            detection_fps: 0.0,
        }
    }

    /// Attach wall-clock throughput for the run.
    pub fn with_timing(mut self, elapsed_seconds: f64, frames_processed: usize) -> Self {
        self.detection_time_seconds = round_to(elapsed_seconds, 2);
        self.detection_fps = if self.detection_time_seconds > 0.0 {
            round_to(frames_processed as f64 / self.detection_time_seconds, 2)
        } else {
            0.0
        };
        self
    }
}
