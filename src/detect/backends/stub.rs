use anyhow::{anyhow, Result};

use crate::detect::backend::DetectorBackend;
use crate::detect::result::{Detection, DetectionResult};
use crate::geometry::BoundingBox;

/// Mean intensity (0..=255) above which the stub reports an object.
const DEFAULT_BRIGHTNESS_CUTOFF: f32 = 128.0;

/// Stub backend for testing and synthetic runs.
///
/// Reports a single full-frame detection of `label` whenever the mean pixel
/// intensity exceeds the cutoff. Confidence is the mean intensity scaled into
/// `[0, 1]`. Pairs with the synthetic `stub://` frame source, which renders
/// bright frames while a synthetic train is present.
pub struct StubBackend {
    label: String,
    cutoff: f32,
}

impl StubBackend {
    pub fn new() -> Self {
        Self {
            label: "train".to_string(),
            cutoff: DEFAULT_BRIGHTNESS_CUTOFF,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }
}

impl Default for StubBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl DetectorBackend for StubBackend {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn detect(&mut self, pixels: &[u8], width: u32, height: u32) -> Result<DetectionResult> {
        if pixels.is_empty() {
            return Err(anyhow!("stub detector received an empty frame"));
        }
        let sum: u64 = pixels.iter().map(|&p| p as u64).sum();
        let mean = sum as f32 / pixels.len() as f32;

        if mean <= self.cutoff {
            return Ok(DetectionResult::default());
        }

        let bbox = BoundingBox::new(0.0, 0.0, width as f32, height as f32);
        Ok(DetectionResult::new(vec![Detection::new(
            self.label.clone(),
            mean / 255.0,
            bbox,
        )]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dark_frame_has_no_detections() {
        let mut backend = StubBackend::new();
        let r = backend.detect(&[20u8; 12], 2, 2).unwrap();
        assert!(r.is_empty());
    }

    #[test]
    fn bright_frame_reports_full_frame_train() {
        let mut backend = StubBackend::new();
        let r = backend.detect(&[230u8; 12], 2, 2).unwrap();
        assert_eq!(r.detections.len(), 1);
        let det = &r.detections[0];
        assert_eq!(det.label, "train");
        assert!((det.confidence - 230.0 / 255.0).abs() < 1e-6);
        assert_eq!(det.bbox, BoundingBox::new(0.0, 0.0, 2.0, 2.0));
    }

    #[test]
    fn empty_frame_is_an_error() {
        let mut backend = StubBackend::new();
        assert!(backend.detect(&[], 0, 0).is_err());
    }
}
