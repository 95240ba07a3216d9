//! Ground-truth scoring: TP/FP/FN accumulation across frames.

use serde::Serialize;

use crate::detect::Detection;
use crate::geometry::{iou_matrix, BoundingBox};
use crate::labels::ClassVocabulary;

/// Stabilizes every precision/recall/F1 denominator.
pub const RATE_EPSILON: f64 = 1e-6;

pub const DEFAULT_IOU_THRESHOLD: f32 = 0.5;

/// How predictions are paired with ground truths within one frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MatchStrategy {
    /// Predictions in given order each take the first still-unmatched ground
    /// truth of the same class with IoU >= threshold.
    ///
    /// Not an optimal assignment: a prediction may consume a ground truth that a
    /// later prediction overlaps better, and ties go to iteration order. Reported
    /// metrics depend on that order, so any other strategy must be a new variant.
    #[default]
    FirstFitGreedy,
}

/// A box with its class: a label and, when known, a vocabulary index.
#[derive(Clone, Debug, PartialEq)]
pub struct LabeledBox {
    pub label: String,
    pub bbox: BoundingBox,
    pub class_id: Option<usize>,
}

impl LabeledBox {
    pub fn new(label: impl Into<String>, bbox: BoundingBox) -> Self {
        Self {
            label: label.into(),
            bbox,
            class_id: None,
        }
    }

    pub fn with_class_id(mut self, class_id: usize) -> Self {
        self.class_id = Some(class_id);
        self
    }
}

impl From<&Detection> for LabeledBox {
    fn from(det: &Detection) -> Self {
        Self {
            label: det.label.clone(),
            bbox: det.bbox,
            class_id: det.class_id,
        }
    }
}

/// Class identity used for matching and per-class bucketing.
///
/// Vocabulary classes compare by index; labels outside the vocabulary compare
/// case-insensitively by name.
#[derive(Clone, Debug, PartialEq, Eq)]
enum ClassKey {
    Known(usize),
    Unknown(String),
}

/// Monotonic counters for one class (or the global total).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ClassCounts {
    pub true_positives: u64,
    pub false_positives: u64,
    pub false_negatives: u64,
}

impl ClassCounts {
    pub fn precision(&self) -> f64 {
        ratio(self.true_positives, self.true_positives + self.false_positives)
    }

    pub fn recall(&self) -> f64 {
        ratio(self.true_positives, self.true_positives + self.false_negatives)
    }

    pub fn f1(&self) -> f64 {
        let p = self.precision();
        let r = self.recall();
        2.0 * p * r / (p + r + RATE_EPSILON)
    }

    /// Ground-truth objects seen for this class.
    pub fn support(&self) -> u64 {
        self.true_positives + self.false_negatives
    }

    pub fn is_empty(&self) -> bool {
        self.true_positives == 0 && self.false_positives == 0 && self.false_negatives == 0
    }
}

fn ratio(num: u64, den: u64) -> f64 {
    num as f64 / (den as f64 + RATE_EPSILON)
}

/// Derived per-class scores.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ClassMetrics {
    #[serde(rename = "class")]
    pub label: String,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: u64,
    #[serde(flatten)]
    pub counts: ClassCounts,
}

/// Accumulates TP/FP/FN over any number of frames, globally and per class.
///
/// Every prediction is counted once as TP or FP, and every ground truth once as
/// TP or FN. Labels outside the vocabulary count toward the totals only.
///
/// Not thread-safe; parallel callers must serialize `update` per stream.
#[derive(Clone, Debug)]
pub struct DetectionMatrix {
    vocab: ClassVocabulary,
    strategy: MatchStrategy,
    totals: ClassCounts,
    per_class: Vec<ClassCounts>,
}

impl DetectionMatrix {
    pub fn new(vocab: ClassVocabulary) -> Self {
        let per_class = vec![ClassCounts::default(); vocab.len()];
        Self {
            vocab,
            strategy: MatchStrategy::default(),
            totals: ClassCounts::default(),
            per_class,
        }
    }

    /// Score one frame's predictions against its ground truths.
    pub fn update(
        &mut self,
        predictions: &[LabeledBox],
        ground_truths: &[LabeledBox],
        iou_threshold: f32,
    ) {
        let pred_keys: Vec<ClassKey> = predictions.iter().map(|p| self.class_key(p)).collect();
        let gt_keys: Vec<ClassKey> = ground_truths.iter().map(|g| self.class_key(g)).collect();

        let (matched_preds, matched_gts) = match self.strategy {
            MatchStrategy::FirstFitGreedy => first_fit_greedy(
                predictions,
                &pred_keys,
                ground_truths,
                &gt_keys,
                iou_threshold,
            ),
        };

        for (key, matched) in pred_keys.iter().zip(&matched_preds) {
            if *matched {
                self.bump(key, |c| c.true_positives += 1);
            } else {
                self.bump(key, |c| c.false_positives += 1);
            }
        }
        for (key, matched) in gt_keys.iter().zip(&matched_gts) {
            if !matched {
                self.bump(key, |c| c.false_negatives += 1);
            }
        }
    }

    /// Convenience for raw detector output.
    pub fn update_detections(
        &mut self,
        predictions: &[Detection],
        ground_truths: &[LabeledBox],
        iou_threshold: f32,
    ) {
        let preds: Vec<LabeledBox> = predictions
            .iter()
            .map(|det| LabeledBox {
                class_id: det.resolve_class(&self.vocab),
                ..LabeledBox::from(det)
            })
            .collect();
        self.update(&preds, ground_truths, iou_threshold);
    }

    fn class_key(&self, labeled: &LabeledBox) -> ClassKey {
        labeled
            .class_id
            .filter(|&idx| idx < self.vocab.len())
            .or_else(|| self.vocab.index_of(&labeled.label))
            .map(ClassKey::Known)
            .unwrap_or_else(|| ClassKey::Unknown(labeled.label.to_ascii_lowercase()))
    }

    fn bump(&mut self, key: &ClassKey, f: impl Fn(&mut ClassCounts)) {
        f(&mut self.totals);
        match key {
            ClassKey::Known(idx) => f(&mut self.per_class[*idx]),
            ClassKey::Unknown(label) => {
                log::debug!("label '{}' not in vocabulary; counted in totals only", label)
            }
        }
    }

    pub fn totals(&self) -> ClassCounts {
        self.totals
    }

    pub fn true_positives(&self) -> u64 {
        self.totals.true_positives
    }

    pub fn false_positives(&self) -> u64 {
        self.totals.false_positives
    }

    pub fn false_negatives(&self) -> u64 {
        self.totals.false_negatives
    }

    pub fn precision(&self) -> f64 {
        self.totals.precision()
    }

    pub fn recall(&self) -> f64 {
        self.totals.recall()
    }

    pub fn f1(&self) -> f64 {
        self.totals.f1()
    }

    /// Scores for every vocabulary class, in vocabulary order.
    pub fn class_matrices(&self) -> Vec<ClassMetrics> {
        self.vocab
            .iter()
            .zip(&self.per_class)
            .map(|(label, counts)| ClassMetrics {
                label: label.to_string(),
                precision: counts.precision(),
                recall: counts.recall(),
                f1: counts.f1(),
                support: counts.support(),
                counts: *counts,
            })
            .collect()
    }
}

/// Returns `(matched_predictions, matched_ground_truths)` flags.
fn first_fit_greedy(
    predictions: &[LabeledBox],
    pred_keys: &[ClassKey],
    ground_truths: &[LabeledBox],
    gt_keys: &[ClassKey],
    iou_threshold: f32,
) -> (Vec<bool>, Vec<bool>) {
    let pred_boxes: Vec<BoundingBox> = predictions.iter().map(|p| p.bbox).collect();
    let gt_boxes: Vec<BoundingBox> = ground_truths.iter().map(|g| g.bbox).collect();
    let ious = iou_matrix(&pred_boxes, &gt_boxes);

    let mut matched_preds = vec![false; predictions.len()];
    let mut matched_gts = vec![false; ground_truths.len()];

    for (i, pred_key) in pred_keys.iter().enumerate() {
        for (j, gt_key) in gt_keys.iter().enumerate() {
            if !matched_gts[j] && ious[i][j] >= iou_threshold && pred_key == gt_key {
                matched_preds[i] = true;
                matched_gts[j] = true;
                break;
            }
        }
    }

    (matched_preds, matched_gts)
}
