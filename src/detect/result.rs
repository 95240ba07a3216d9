use serde::{Deserialize, Serialize};

use crate::geometry::BoundingBox;
use crate::labels::ClassVocabulary;

/// Result of running detection on a frame.
#[derive(Clone, Debug, Default)]
pub struct DetectionResult {
    /// Predictions in no particular order.
    pub detections: Vec<Detection>,
}

impl DetectionResult {
    pub fn new(detections: Vec<Detection>) -> Self {
        Self { detections }
    }

    pub fn is_empty(&self) -> bool {
        self.detections.is_empty()
    }
}

/// One prediction from a detector. Immutable once produced.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Class label from the detector's vocabulary.
    #[serde(rename = "class")]
    pub label: String,
    /// Score in `[0, 1]`.
    pub confidence: f32,
    pub bbox: BoundingBox,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_id: Option<usize>,
}

impl Detection {
    pub fn new(label: impl Into<String>, confidence: f32, bbox: BoundingBox) -> Self {
        Self {
            label: label.into(),
            confidence: confidence.clamp(0.0, 1.0),
            bbox,
            class_id: None,
        }
    }

    pub fn with_class_id(mut self, class_id: usize) -> Self {
        self.class_id = Some(class_id);
        self
    }

    /// Build from a raw class index, resolving the label through `vocab`.
    pub fn from_class_id(
        vocab: &ClassVocabulary,
        class_id: usize,
        confidence: f32,
        bbox: BoundingBox,
    ) -> Self {
        let label = vocab.name(class_id).unwrap_or("unknown");
        Self::new(label, confidence, bbox).with_class_id(class_id)
    }

    /// Vocabulary index, preferring the detector-supplied one.
    pub fn resolve_class(&self, vocab: &ClassVocabulary) -> Option<usize> {
        self.class_id.or_else(|| vocab.index_of(&self.label))
    }
}
