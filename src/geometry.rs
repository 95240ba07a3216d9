//! Axis-aligned box geometry.
//!
//! Boxes are in pixel space as `(x1, y1, x2, y2)`. Degenerate boxes (zero width
//! or height) are valid; they simply have zero area and never overlap.

use serde::{Deserialize, Serialize};

/// Added to every IoU denominator so disjoint or degenerate pairs yield 0.
pub const IOU_EPSILON: f32 = 1e-6;

/// Pixel-space bounding box. Serializes as `[x1, y1, x2, y2]`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f32; 4]", into = "[f32; 4]")]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BoundingBox {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Build from center/size form, as emitted by YOLO-style heads.
    pub fn from_center(cx: f32, cy: f32, w: f32, h: f32) -> Self {
        Self {
            x1: cx - w / 2.0,
            y1: cy - h / 2.0,
            x2: cx + w / 2.0,
            y2: cy + h / 2.0,
        }
    }

    pub fn width(&self) -> f32 {
        (self.x2 - self.x1).max(0.0)
    }

    pub fn height(&self) -> f32 {
        (self.y2 - self.y1).max(0.0)
    }

    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    /// Clamp all coordinates into `[0, width] x [0, height]`.
    pub fn clamp_to(&self, width: f32, height: f32) -> Self {
        Self {
            x1: self.x1.clamp(0.0, width),
            y1: self.y1.clamp(0.0, height),
            x2: self.x2.clamp(0.0, width),
            y2: self.y2.clamp(0.0, height),
        }
    }

    pub fn scale(&self, sx: f32, sy: f32) -> Self {
        Self {
            x1: self.x1 * sx,
            y1: self.y1 * sy,
            x2: self.x2 * sx,
            y2: self.y2 * sy,
        }
    }
}

impl From<[f32; 4]> for BoundingBox {
    fn from(v: [f32; 4]) -> Self {
        Self::new(v[0], v[1], v[2], v[3])
    }
}

impl From<BoundingBox> for [f32; 4] {
    fn from(b: BoundingBox) -> Self {
        [b.x1, b.y1, b.x2, b.y2]
    }
}

/// Intersection over union of two boxes, in `[0, 1]`.
///
/// The denominator carries [`IOU_EPSILON`], so identical boxes may score slightly
/// below 1 and a zero-area union scores 0 instead of NaN. Symmetric in its
/// arguments.
pub fn iou(a: &BoundingBox, b: &BoundingBox) -> f32 {
    let ix1 = a.x1.max(b.x1);
    let iy1 = a.y1.max(b.y1);
    let ix2 = a.x2.min(b.x2);
    let iy2 = a.y2.min(b.y2);

    let inter = (ix2 - ix1).max(0.0) * (iy2 - iy1).max(0.0);
    let union = a.area() + b.area() - inter;

    (inter / (union + IOU_EPSILON)).clamp(0.0, 1.0)
}

/// Row-major `|rows| x |cols|` IoU table.
pub fn iou_matrix(rows: &[BoundingBox], cols: &[BoundingBox]) -> Vec<Vec<f32>> {
    rows.iter()
        .map(|r| cols.iter().map(|c| iou(r, c)).collect())
        .collect()
}

/// Elementwise mean of a set of boxes. `None` when the set is empty.
pub fn mean_box<'a, I>(boxes: I) -> Option<BoundingBox>
where
    I: IntoIterator<Item = &'a BoundingBox>,
{
    let mut sum = [0.0f32; 4];
    let mut n = 0usize;
    for b in boxes {
        sum[0] += b.x1;
        sum[1] += b.y1;
        sum[2] += b.x2;
        sum[3] += b.y2;
        n += 1;
    }
    if n == 0 {
        return None;
    }
    let n = n as f32;
    Some(BoundingBox::new(sum[0] / n, sum[1] / n, sum[2] / n, sum[3] / n))
}
