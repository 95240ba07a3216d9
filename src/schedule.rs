//! Expected-arrival schedule and matching against detections.

use serde::{Deserialize, Serialize};

use crate::detect::DetectionCriteria;
use crate::frame::{format_timestamp, Frame};
use crate::metrics::recorded_confidence;

pub const DEFAULT_NUM_TRAINS: usize = 5;
pub const DEFAULT_TOLERANCE_SECS: f64 = 15.0;

/// One expected arrival.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    /// 1-based.
    pub train_id: usize,
    /// Seconds since video start.
    pub expected_time: f64,
    /// `H:MM:SS` form of `expected_time`.
    pub expected_timestamp: String,
    /// Symmetric window half-width, in seconds.
    pub tolerance: f64,
    pub detected: bool,
    /// Timestamp of the best match; empty or a single entry.
    pub detection_times: Vec<f64>,
    /// Recorded (2 dp) confidence of the best match, 0 when undetected.
    pub confidence: f64,
}

impl ScheduleEntry {
    pub fn new(train_id: usize, expected_time: f64, tolerance: f64) -> Self {
        Self {
            train_id,
            expected_time,
            expected_timestamp: format_timestamp(expected_time),
            tolerance,
            detected: false,
            detection_times: Vec::new(),
            confidence: 0.0,
        }
    }

    /// Inclusive `(start, end)` of the arrival window, in seconds.
    pub fn window(&self) -> (f64, f64) {
        (
            self.expected_time - self.tolerance,
            self.expected_time + self.tolerance,
        )
    }

    pub fn contains(&self, timestamp: f64) -> bool {
        let (start, end) = self.window();
        start <= timestamp && timestamp <= end
    }
}

/// Spread `num_trains` arrivals evenly over the video, excluding both edges:
/// arrival `i` is at `duration / (num_trains + 1) * i` for `i = 1..=num_trains`.
pub fn generate_schedule(
    duration_seconds: f64,
    num_trains: usize,
    tolerance: f64,
) -> Vec<ScheduleEntry> {
    let interval = duration_seconds / (num_trains as f64 + 1.0);
    (1..=num_trains)
        .map(|id| ScheduleEntry::new(id, interval * id as f64, tolerance))
        .collect()
}

/// Marks schedule entries detected from per-frame detections.
#[derive(Clone, Debug)]
pub struct ScheduleMatcher {
    criteria: DetectionCriteria,
}

impl ScheduleMatcher {
    pub fn new(criteria: DetectionCriteria) -> Self {
        Self { criteria }
    }

    /// Re-evaluate every entry against `frames`, overwriting previous results.
    ///
    /// For each entry, qualifying detections in frames within the tolerance
    /// window are collected and the one whose frame is closest to the expected
    /// time wins (earliest in frame order on ties). Idempotent for fixed input.
    pub fn apply(&self, schedule: &mut [ScheduleEntry], frames: &[Frame]) {
        for entry in schedule.iter_mut() {
            let mut best: Option<(f64, f64)> = None;
            for frame in frames.iter().filter(|f| entry.contains(f.timestamp_seconds)) {
                let distance = (frame.timestamp_seconds - entry.expected_time).abs();
                for det in frame.detections.iter().filter(|d| self.criteria.qualifies(d)) {
                    let closer = match best {
                        Some((best_ts, _)) => distance < (best_ts - entry.expected_time).abs(),
                        None => true,
                    };
                    if closer {
                        best = Some((
                            frame.timestamp_seconds,
                            recorded_confidence(det.confidence),
                        ));
                    }
                }
            }

            match best {
                Some((timestamp, confidence)) => {
                    entry.detected = true;
                    entry.detection_times = vec![timestamp];
                    entry.confidence = confidence;
                }
                None => {
                    entry.detected = false;
                    entry.detection_times.clear();
                    entry.confidence = 0.0;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::Detection;
    use crate::geometry::BoundingBox;

    fn det(label: &str, confidence: f32) -> Detection {
        Detection::new(label, confidence, BoundingBox::new(0.0, 0.0, 10.0, 10.0))
    }

    #[test]
    fn evenly_spaced_without_edges() {
        let schedule = generate_schedule(100.0, 3, 15.0);
        let times: Vec<f64> = schedule.iter().map(|e| e.expected_time).collect();
        assert_eq!(times, vec![25.0, 50.0, 75.0]);
        assert_eq!(
            schedule.iter().map(|e| e.train_id).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
        assert!(schedule.iter().all(|e| e.tolerance == 15.0 && !e.detected));
        assert_eq!(schedule[1].expected_timestamp, "0:00:50");
    }

    #[test]
    fn zero_trains_or_duration() {
        assert!(generate_schedule(100.0, 0, 15.0).is_empty());
        let schedule = generate_schedule(0.0, 2, 15.0);
        assert!(schedule.iter().all(|e| e.expected_time == 0.0));
    }

    #[test]
    fn detection_within_tolerance_marks_entry() {
        let mut schedule = generate_schedule(100.0, 3, 15.0);
        let frames = vec![Frame::new(26, 26.0, vec![det("train", 0.9)])];
        ScheduleMatcher::new(DetectionCriteria::default()).apply(&mut schedule, &frames);

        assert!(schedule[0].detected);
        assert_eq!(schedule[0].detection_times, vec![26.0]);
        assert_eq!(schedule[0].confidence, 0.9);
        assert!(!schedule[1].detected);
        assert!(!schedule[2].detected);
        assert_eq!(schedule[2].confidence, 0.0);
    }

    #[test]
    fn window_edges_are_inclusive() {
        let mut schedule = vec![ScheduleEntry::new(1, 50.0, 15.0)];
        let matcher = ScheduleMatcher::new(DetectionCriteria::default());

        matcher.apply(&mut schedule, &[Frame::new(0, 65.0, vec![det("train", 0.9)])]);
        assert!(schedule[0].detected);

        matcher.apply(&mut schedule, &[Frame::new(0, 65.5, vec![det("train", 0.9)])]);
        assert!(!schedule[0].detected);
        assert!(schedule[0].detection_times.is_empty());
    }

    #[test]
    fn ignores_wrong_class_and_weak_detections() {
        let mut schedule = vec![ScheduleEntry::new(1, 50.0, 15.0)];
        let frames = vec![
            Frame::new(0, 50.0, vec![det("bus", 0.99)]),
            Frame::new(1, 51.0, vec![det("train", 0.5)]),
        ];
        ScheduleMatcher::new(DetectionCriteria::default()).apply(&mut schedule, &frames);
        assert!(!schedule[0].detected);
    }

    #[test]
    fn closest_frame_wins_and_ties_keep_first() {
        let mut schedule = vec![ScheduleEntry::new(1, 50.0, 15.0)];
        let frames = vec![
            Frame::new(0, 40.0, vec![det("train", 0.99)]),
            Frame::new(1, 48.0, vec![det("train", 0.81)]),
            Frame::new(2, 52.0, vec![det("train", 0.95)]),
            Frame::new(3, 49.0, vec![det("train", 0.85), det("train", 0.97)]),
        ];
        ScheduleMatcher::new(DetectionCriteria::default()).apply(&mut schedule, &frames);
        assert_eq!(schedule[0].detection_times, vec![49.0]);
        assert_eq!(schedule[0].confidence, 0.85);
    }

    #[test]
    fn confidence_is_recorded_at_two_places() {
        let mut schedule = vec![ScheduleEntry::new(1, 1.5, 15.0)];
        let frames = vec![Frame::new(1, 1.0, vec![det("train", 0.912)])];
        ScheduleMatcher::new(DetectionCriteria::default()).apply(&mut schedule, &frames);
        assert_eq!(schedule[0].confidence, 0.91);
    }

    #[test]
    fn matching_is_idempotent() {
        let mut schedule = generate_schedule(100.0, 3, 15.0);
        let frames = vec![
            Frame::new(0, 26.0, vec![det("train", 0.9)]),
            Frame::new(1, 70.0, vec![det("train", 0.88)]),
        ];
        let matcher = ScheduleMatcher::new(DetectionCriteria::default());
        matcher.apply(&mut schedule, &frames);
        let first = schedule.clone();
        matcher.apply(&mut schedule, &frames);
        assert_eq!(schedule, first);
    }
}
