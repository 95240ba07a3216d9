//! Results record and its on-disk artifact.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use serde::Serialize;

use crate::frame::Frame;
use crate::geometry::BoundingBox;
use crate::metrics::{ClassMetrics, DetectionMatrix, SummaryStatistics};
use crate::schedule::ScheduleEntry;
use crate::stability::TrackPhase;

/// Fixed artifact name inside the results directory. Overwritten every run.
pub const RESULTS_FILE_NAME: &str = "detection_results.json";

/// Everything a run produces. Plain JSON: numbers, strings, booleans, nesting.
#[derive(Clone, Debug, Serialize)]
pub struct ResultsRecord {
    /// Frames with at least one qualifying detection, listing only those.
    pub train_frames: Vec<Frame>,
    pub statistics: SummaryStatistics,
    pub video_path: String,
    pub schedule: Vec<ScheduleEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ground_truth: Option<GroundTruthReport>,
    pub stabilized_track: Vec<TrackPoint>,
}

/// Ground-truth scores for runs with annotations.
#[derive(Clone, Debug, Serialize)]
pub struct GroundTruthReport {
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub true_positives: u64,
    pub false_positives: u64,
    pub false_negatives: u64,
    /// Classes with at least one TP, FP or FN, in vocabulary order.
    pub per_class: Vec<ClassMetrics>,
}

impl From<&DetectionMatrix> for GroundTruthReport {
    fn from(matrix: &DetectionMatrix) -> Self {
        Self {
            precision: matrix.precision(),
            recall: matrix.recall(),
            f1_score: matrix.f1(),
            true_positives: matrix.true_positives(),
            false_positives: matrix.false_positives(),
            false_negatives: matrix.false_negatives(),
            per_class: matrix
                .class_matrices()
                .into_iter()
                .filter(|row| !row.counts.is_empty())
                .collect(),
        }
    }
}

/// Stabilized box emitted for one sampled frame.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TrackPoint {
    pub frame: usize,
    pub timestamp_seconds: f64,
    pub phase: TrackPhase,
    pub bbox: BoundingBox,
    pub alpha: f32,
}

/// Write `record` to `<results_dir>/detection_results.json`, replacing any
/// previous run. Returns the artifact path.
pub fn write_results(results_dir: &Path, record: &ResultsRecord) -> Result<PathBuf> {
    std::fs::create_dir_all(results_dir).map_err(|e| {
        anyhow!(
            "failed to create results directory {}: {}",
            results_dir.display(),
            e
        )
    })?;
    let path = results_dir.join(RESULTS_FILE_NAME);
    let json = serde_json::to_string_pretty(record)?;
    std::fs::write(&path, json)
        .map_err(|e| anyhow!("failed to write {}: {}", path.display(), e))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::labels::ClassVocabulary;
    use crate::metrics::LabeledBox;

    fn record() -> ResultsRecord {
        ResultsRecord {
            train_frames: vec![],
            statistics: SummaryStatistics::default(),
            video_path: "stub://yard".to_string(),
            schedule: vec![ScheduleEntry::new(1, 25.0, 15.0)],
            ground_truth: None,
            stabilized_track: vec![],
        }
    }

    #[test]
    fn overwrites_previous_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let mut rec = record();
        let path = write_results(dir.path(), &rec).unwrap();
        assert_eq!(path, dir.path().join(RESULTS_FILE_NAME));

        rec.video_path = "stub://second".to_string();
        write_results(dir.path(), &rec).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["video_path"], "stub://second");
        assert_eq!(value["schedule"][0]["expected_timestamp"], "0:00:25");
        assert!(value.get("ground_truth").is_none());
    }

    #[test]
    fn ground_truth_report_lists_active_classes() {
        let mut matrix = DetectionMatrix::new(ClassVocabulary::coco());
        let b = LabeledBox::new("train", BoundingBox::new(0.0, 0.0, 10.0, 10.0));
        matrix.update(&[b.clone()], &[b], 0.5);

        let report = GroundTruthReport::from(&matrix);
        assert_eq!(report.true_positives, 1);
        assert_eq!(report.per_class.len(), 1);
        assert_eq!(report.per_class[0].label, "train");

        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["per_class"][0]["class"], "train");
        assert_eq!(value["per_class"][0]["true_positives"], 1);
        assert_eq!(value["per_class"][0]["support"], 1);
    }
}
