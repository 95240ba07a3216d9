//! Frame types.
//!
//! - `FrameImage`: decoded RGB24 pixels handed to a detector.
//! - `SampledFrame`: one frame kept by the sampler, with its position in the video.
//! - `Frame`: a sampled frame's identity plus the detections attached to it.

use serde::{Deserialize, Serialize};

use crate::detect::Detection;

/// Decoded RGB24 image. Pixel bytes are row-major, 3 bytes per pixel.
#[derive(Clone)]
pub struct FrameImage {
    pixels: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl FrameImage {
    pub fn new(pixels: Vec<u8>, width: u32, height: u32) -> Self {
        Self {
            pixels,
            width,
            height,
        }
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }
}

// Pixel bytes stay out of debug output.
impl std::fmt::Debug for FrameImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.pixels.len())
            .finish()
    }
}

/// A frame kept by the sampler.
#[derive(Clone, Debug)]
pub struct SampledFrame {
    /// 0-based position among sampled frames.
    pub index: usize,
    /// Stable name, e.g. `frame_0007`.
    pub name: String,
    /// Seconds since video start.
    pub timestamp_seconds: f64,
    pub image: FrameImage,
}

impl SampledFrame {
    pub fn new(index: usize, timestamp_seconds: f64, image: FrameImage) -> Self {
        Self {
            index,
            name: frame_name(index),
            timestamp_seconds,
            image,
        }
    }
}

/// A sampled frame with its detections. Created once per frame after detection.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub index: usize,
    #[serde(rename = "frame")]
    pub name: String,
    /// `H:MM:SS`, whole seconds.
    pub timestamp: String,
    pub timestamp_seconds: f64,
    pub detections: Vec<Detection>,
}

impl Frame {
    pub fn new(index: usize, timestamp_seconds: f64, detections: Vec<Detection>) -> Self {
        Self {
            index,
            name: frame_name(index),
            timestamp: format_timestamp(timestamp_seconds),
            timestamp_seconds,
            detections,
        }
    }

    /// Same identity and timestamp, different detections.
    pub fn with_detections(&self, detections: Vec<Detection>) -> Self {
        Self {
            detections,
            ..self.clone()
        }
    }
}

pub fn frame_name(index: usize) -> String {
    format!("frame_{:04}", index)
}

/// Render seconds as `H:MM:SS`, truncating fractions. Negative input renders as `0:00:00`.
pub fn format_timestamp(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds as u64
    } else {
        0
    };
    format!("{}:{:02}:{:02}", total / 3600, (total % 3600) / 60, total % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamps_truncate_to_whole_seconds() {
        assert_eq!(format_timestamp(0.0), "0:00:00");
        assert_eq!(format_timestamp(25.9), "0:00:25");
        assert_eq!(format_timestamp(3725.0), "1:02:05");
        assert_eq!(format_timestamp(-4.0), "0:00:00");
        assert_eq!(format_timestamp(f64::NAN), "0:00:00");
    }

    #[test]
    fn frame_names_are_zero_padded() {
        assert_eq!(frame_name(7), "frame_0007");
        assert_eq!(frame_name(12345), "frame_12345");
    }

    #[test]
    fn debug_output_omits_pixels() {
        let image = FrameImage::new(vec![1, 2, 3], 1, 1);
        let rendered = format!("{:?}", image);
        assert!(rendered.contains("bytes: 3"));
        assert!(!rendered.contains("[1, 2, 3]"));
    }

    #[test]
    fn frame_serializes_with_record_field_names() {
        let frame = Frame::new(3, 26.0, vec![]);
        let value = serde_json::to_value(&frame).unwrap();
        assert_eq!(value["frame"], "frame_0003");
        assert_eq!(value["timestamp"], "0:00:26");
        assert_eq!(value["timestamp_seconds"], 26.0);
    }
}
