use crate::detect::result::Detection;
use crate::labels::ClassVocabulary;

pub const DEFAULT_TARGET_LABEL: &str = "train";
pub const DEFAULT_THRESHOLD: f32 = 0.8;

/// Decides which detections count as a sighting of the target class.
///
/// A detection qualifies when its label matches the target (case-insensitive)
/// or its class index equals the target's vocabulary index, and its confidence
/// is at least `threshold`.
#[derive(Clone, Debug, PartialEq)]
pub struct DetectionCriteria {
    pub target_label: String,
    pub target_class_id: Option<usize>,
    pub threshold: f32,
}

impl DetectionCriteria {
    pub fn new(vocab: &ClassVocabulary, target_label: &str, threshold: f32) -> Self {
        Self {
            target_label: target_label.to_string(),
            target_class_id: vocab.index_of(target_label),
            threshold,
        }
    }

    pub fn is_target(&self, det: &Detection) -> bool {
        det.label.eq_ignore_ascii_case(&self.target_label)
            || (det.class_id.is_some() && det.class_id == self.target_class_id)
    }

    pub fn meets_threshold(&self, det: &Detection) -> bool {
        det.confidence >= self.threshold
    }

    pub fn qualifies(&self, det: &Detection) -> bool {
        self.is_target(det) && self.meets_threshold(det)
    }
}

impl Default for DetectionCriteria {
    fn default() -> Self {
        Self::new(&ClassVocabulary::coco(), DEFAULT_TARGET_LABEL, DEFAULT_THRESHOLD)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::BoundingBox;

    fn det(label: &str, confidence: f32) -> Detection {
        Detection::new(label, confidence, BoundingBox::new(0.0, 0.0, 1.0, 1.0))
    }

    #[test]
    fn label_and_threshold() {
        let c = DetectionCriteria::default();
        assert!(c.qualifies(&det("train", 0.8)));
        assert!(c.qualifies(&det("Train", 0.95)));
        assert!(!c.qualifies(&det("train", 0.79)));
        assert!(!c.qualifies(&det("bus", 0.99)));
    }

    #[test]
    fn class_index_also_matches() {
        let c = DetectionCriteria::default();
        assert_eq!(c.target_class_id, Some(6));
        assert!(c.qualifies(&det("locomotive", 0.9).with_class_id(6)));
        assert!(!c.qualifies(&det("locomotive", 0.9).with_class_id(5)));
    }
}
