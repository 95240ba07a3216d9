#![cfg(feature = "backend-tract")]

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use tract_onnx::prelude::*;

use crate::detect::backend::DetectorBackend;
use crate::detect::result::{Detection, DetectionResult};
use crate::geometry::{iou, BoundingBox};
use crate::labels::ClassVocabulary;

const CXYWH: usize = 4;
const DEFAULT_INPUT_SIZE: u32 = 640;
const DEFAULT_NMS_IOU: f32 = 0.45;

/// Tract-based YOLOv8 backend.
///
/// Loads a local ONNX export with a `[1, 4 + nc, anchors]` output head. Frames
/// of any size are resampled (nearest neighbour) to the square model input and
/// boxes are scaled back to frame pixels.
pub struct TractBackend {
    model: SimplePlan<TypedFact, Box<dyn TypedOp>>,
    vocab: ClassVocabulary,
    input_size: u32,
    confidence_threshold: f32,
    nms_iou: f32,
}

impl TractBackend {
    /// Load an ONNX model from disk and prepare it for inference.
    pub fn new<P: AsRef<Path>>(model_path: P, vocab: ClassVocabulary) -> Result<Self> {
        let model_path = model_path.as_ref();
        let size = DEFAULT_INPUT_SIZE;
        let model = tract_onnx::onnx()
            .model_for_path(model_path)
            .with_context(|| format!("failed to load ONNX model from {}", model_path.display()))?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(
                    f32::datum_type(),
                    tvec!(1, 3, size as usize, size as usize),
                ),
            )
            .context("failed to set input fact")?
            .into_optimized()
            .context("failed to optimize ONNX model")?
            .into_runnable()
            .context("failed to build runnable ONNX model")?;

        Ok(Self {
            model,
            vocab,
            input_size: size,
            confidence_threshold: 0.25,
            nms_iou: DEFAULT_NMS_IOU,
        })
    }

    /// Override the minimum score kept before NMS.
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.confidence_threshold = threshold;
        self
    }

    fn build_input(&self, pixels: &[u8], width: u32, height: u32) -> Result<Tensor> {
        let expected_len = (width as usize)
            .checked_mul(height as usize)
            .and_then(|v| v.checked_mul(3))
            .ok_or_else(|| anyhow!("frame dimensions overflow"))?;

        if expected_len == 0 || pixels.len() != expected_len {
            return Err(anyhow!(
                "expected {} RGB bytes, received {}",
                expected_len,
                pixels.len()
            ));
        }

        let size = self.input_size as usize;
        let (src_w, src_h) = (width as usize, height as usize);
        let input = tract_ndarray::Array4::from_shape_fn((1, 3, size, size), |(_, c, y, x)| {
            let sx = (x * src_w / size).min(src_w - 1);
            let sy = (y * src_h / size).min(src_h - 1);
            pixels[(sy * src_w + sx) * 3 + c] as f32 / 255.0
        });

        Ok(input.into_tensor())
    }

    fn decode(&self, outputs: TVec<TValue>, width: u32, height: u32) -> Result<Vec<Detection>> {
        let output = outputs
            .first()
            .ok_or_else(|| anyhow!("model produced no outputs"))?;
        let preds = output
            .to_array_view::<f32>()
            .context("model output tensor was not f32")?;
        let candidates = decode_predictions(
            &preds,
            &self.vocab,
            self.input_size,
            self.confidence_threshold,
            width,
            height,
        )?;
        Ok(non_max_suppression(candidates, self.nms_iou))
    }
}

/// Turn a `[batch, 4 + nc, anchors]` YOLOv8 head into frame-space detections
/// for the first batch entry, before NMS.
pub(crate) fn decode_predictions(
    preds: &tract_ndarray::ArrayViewD<f32>,
    vocab: &ClassVocabulary,
    input_size: u32,
    confidence_threshold: f32,
    width: u32,
    height: u32,
) -> Result<Vec<Detection>> {
    let shape = preds.shape();
    if shape.len() != 3 || shape[0] == 0 || shape[1] <= CXYWH {
        return Err(anyhow!("unexpected YOLO output shape {:?}", shape));
    }
    let (rows, anchors) = (shape[1], shape[2]);
    let sx = width as f32 / input_size as f32;
    let sy = height as f32 / input_size as f32;

    let mut candidates = Vec::new();
    for a in 0..anchors {
        let mut best = (0usize, f32::NEG_INFINITY);
        for class in 0..rows - CXYWH {
            let score = preds[[0, CXYWH + class, a]];
            if score > best.1 {
                best = (class, score);
            }
        }
        let (class_id, confidence) = best;
        if confidence < confidence_threshold {
            continue;
        }
        let bbox = BoundingBox::from_center(
            preds[[0, 0, a]],
            preds[[0, 1, a]],
            preds[[0, 2, a]],
            preds[[0, 3, a]],
        )
        .scale(sx, sy)
        .clamp_to(width as f32, height as f32);
        candidates.push(Detection::from_class_id(vocab, class_id, confidence, bbox));
    }
    Ok(candidates)
}

/// Greedy per-class NMS, highest score first.
pub(crate) fn non_max_suppression(mut dets: Vec<Detection>, iou_threshold: f32) -> Vec<Detection> {
    dets.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    let mut kept: Vec<Detection> = Vec::with_capacity(dets.len());
    for det in dets {
        let suppressed = kept
            .iter()
            .any(|k| k.class_id == det.class_id && iou(&k.bbox, &det.bbox) > iou_threshold);
        if !suppressed {
            kept.push(det);
        }
    }
    kept
}

impl DetectorBackend for TractBackend {
    fn name(&self) -> &'static str {
        "tract"
    }

    fn detect(&mut self, pixels: &[u8], width: u32, height: u32) -> Result<DetectionResult> {
        let input = self.build_input(pixels, width, height)?;
        let outputs = self
            .model
            .run(tvec!(input.into()))
            .context("ONNX inference failed")?;
        Ok(DetectionResult::new(self.decode(outputs, width, height)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nms_drops_overlapping_same_class() {
        let vocab = ClassVocabulary::coco();
        let a = Detection::from_class_id(&vocab, 6, 0.9, BoundingBox::new(0.0, 0.0, 10.0, 10.0));
        let b = Detection::from_class_id(&vocab, 6, 0.8, BoundingBox::new(1.0, 1.0, 10.0, 10.0));
        let c = Detection::from_class_id(&vocab, 0, 0.7, BoundingBox::new(1.0, 1.0, 10.0, 10.0));
        let kept = non_max_suppression(vec![b, a.clone(), c.clone()], 0.45);
        assert_eq!(kept, vec![a, c]);
    }

    #[test]
    fn decode_rejects_empty_batch() {
        let vocab = ClassVocabulary::coco();
        let empty = tract_ndarray::ArrayD::<f32>::zeros(tract_ndarray::IxDyn(&[0, 84, 8]));
        assert!(decode_predictions(&empty.view(), &vocab, 640, 0.25, 640, 480).is_err());

        let flat = tract_ndarray::ArrayD::<f32>::zeros(tract_ndarray::IxDyn(&[1, 4, 8]));
        assert!(decode_predictions(&flat.view(), &vocab, 640, 0.25, 640, 480).is_err());
    }

    #[test]
    fn decode_picks_best_class_and_scales_boxes() {
        let vocab = ClassVocabulary::new(["car", "train"]);
        let head = tract_ndarray::ArrayD::from_shape_vec(
            tract_ndarray::IxDyn(&[1, 6, 2]),
            vec![
                320.0, 100.0, // cx
                320.0, 100.0, // cy
                64.0, 10.0, // w
                64.0, 10.0, // h
                0.1, 0.05, // car
                0.9, 0.1, // train
            ],
        )
        .unwrap();
        let dets = decode_predictions(&head.view(), &vocab, 640, 0.25, 320, 320).unwrap();
        assert_eq!(dets.len(), 1);
        assert_eq!(dets[0].label, "train");
        assert_eq!(dets[0].class_id, Some(1));
        assert_eq!(dets[0].bbox, BoundingBox::new(144.0, 144.0, 176.0, 176.0));
    }
}
