//! Ground-truth annotations for scoring a run.
//!
//! File format (JSON): an object keyed by sampled-frame index, each value a
//! list of `{"class", "bbox": [x1, y1, x2, y2]}` objects. Frames without a key
//! have no ground-truth objects.
//!
//! ```json
//! { "12": [{"class": "train", "bbox": [40, 80, 600, 420]}] }
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{anyhow, Result};
use serde::Deserialize;

use crate::geometry::BoundingBox;
use crate::metrics::LabeledBox;

#[derive(Debug, Deserialize)]
struct AnnotationFile(BTreeMap<String, Vec<AnnotationEntry>>);

#[derive(Debug, Deserialize)]
struct AnnotationEntry {
    class: String,
    bbox: BoundingBox,
}

/// Per-frame ground-truth boxes.
#[derive(Clone, Debug, Default)]
pub struct GroundTruth {
    frames: BTreeMap<usize, Vec<LabeledBox>>,
}

impl GroundTruth {
    pub fn from_path(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow!("failed to read ground truth {}: {}", path.display(), e))?;
        Self::from_json(&raw)
            .map_err(|e| anyhow!("invalid ground truth {}: {}", path.display(), e))
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let AnnotationFile(entries) = serde_json::from_str(raw)?;
        let mut frames = BTreeMap::new();
        for (key, boxes) in entries {
            let index: usize = key
                .trim()
                .parse()
                .map_err(|_| anyhow!("frame key '{}' is not a frame index", key))?;
            let boxes = boxes
                .into_iter()
                .map(|entry| LabeledBox::new(entry.class, entry.bbox))
                .collect();
            frames.insert(index, boxes);
        }
        Ok(Self { frames })
    }

    /// Ground truths for a frame; empty when unannotated.
    pub fn for_frame(&self, index: usize) -> &[LabeledBox] {
        self.frames.get(&index).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn annotated_frames(&self) -> usize {
        self.frames.len()
    }

    pub fn object_count(&self) -> usize {
        self.frames.values().map(Vec::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_frame_keyed_annotations() {
        let gt = GroundTruth::from_json(
            r#"{
                "0": [{"class": "train", "bbox": [0, 0, 10, 10]}],
                "3": [{"class": "train", "bbox": [5, 5, 15, 15]},
                      {"class": "person", "bbox": [1, 1, 2, 2]}]
            }"#,
        )
        .unwrap();
        assert_eq!(gt.annotated_frames(), 2);
        assert_eq!(gt.object_count(), 3);
        assert_eq!(gt.for_frame(3)[1].label, "person");
        assert!(gt.for_frame(1).is_empty());
    }

    #[test]
    fn rejects_non_numeric_keys() {
        assert!(GroundTruth::from_json(r#"{"frame_0001": []}"#).is_err());
    }
}
