use std::path::Path;

use anyhow::{anyhow, Result};

use crate::detect::backend::DetectorBackend;
use crate::detect::result::{Detection, DetectionResult};

/// Replays detector output recorded elsewhere.
///
/// The file is a JSON array with one entry per sampled frame, in frame order;
/// each entry is an array of `{"class", "confidence", "bbox": [x1, y1, x2, y2]}`.
/// Running past the end of the recording is an error, since it means the
/// recording does not belong to this video.
pub struct ReplayBackend {
    frames: Vec<Vec<Detection>>,
    cursor: usize,
}

impl ReplayBackend {
    pub fn from_path(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow!("failed to read replay file {}: {}", path.display(), e))?;
        Self::from_json(&raw)
            .map_err(|e| anyhow!("invalid replay file {}: {}", path.display(), e))
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let frames: Vec<Vec<Detection>> = serde_json::from_str(raw)?;
        for (idx, frame) in frames.iter().enumerate() {
            if let Some(det) = frame
                .iter()
                .find(|det| !(0.0..=1.0).contains(&det.confidence))
            {
                return Err(anyhow!(
                    "frame {} has confidence {} outside [0, 1]",
                    idx,
                    det.confidence
                ));
            }
        }
        Ok(Self { frames, cursor: 0 })
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl DetectorBackend for ReplayBackend {
    fn name(&self) -> &'static str {
        "replay"
    }

    fn detect(&mut self, _pixels: &[u8], _width: u32, _height: u32) -> Result<DetectionResult> {
        let frame = self.frames.get(self.cursor).ok_or_else(|| {
            anyhow!(
                "replay exhausted after {} frames; recording does not match the video",
                self.frames.len()
            )
        })?;
        self.cursor += 1;
        Ok(DetectionResult::new(frame.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RECORDING: &str = r#"[
        [],
        [{"class": "train", "confidence": 0.91, "bbox": [10, 20, 300, 200]},
         {"class": "person", "confidence": 0.4, "bbox": [0, 0, 5, 5], "class_id": 0}]
    ]"#;

    #[test]
    fn replays_in_order() {
        let mut backend = ReplayBackend::from_json(RECORDING).unwrap();
        assert_eq!(backend.len(), 2);

        assert!(backend.detect(&[], 0, 0).unwrap().is_empty());
        let second = backend.detect(&[], 0, 0).unwrap();
        assert_eq!(second.detections.len(), 2);
        assert_eq!(second.detections[0].label, "train");
        assert_eq!(second.detections[1].class_id, Some(0));

        assert!(backend.detect(&[], 0, 0).is_err());
    }

    #[test]
    fn rejects_out_of_range_confidence() {
        let bad = r#"[[{"class": "train", "confidence": 1.5, "bbox": [0, 0, 1, 1]}]]"#;
        assert!(ReplayBackend::from_json(bad).is_err());
    }
}
