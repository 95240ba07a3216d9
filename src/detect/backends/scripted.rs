use anyhow::{anyhow, Result};

use crate::detect::backend::DetectorBackend;
use crate::detect::result::{Detection, DetectionResult};

/// Backend that returns a fixed list of detections per call, in call order.
///
/// Calls beyond the end of the script return no detections. Useful for driving
/// the pipeline with known detector output.
pub struct ScriptedBackend {
    script: Vec<Vec<Detection>>,
    cursor: usize,
    fail_at: Option<usize>,
}

impl ScriptedBackend {
    pub fn new(script: Vec<Vec<Detection>>) -> Self {
        Self {
            script,
            cursor: 0,
            fail_at: None,
        }
    }

    /// Make the call with this zero-based index return an error.
    pub fn failing_at(mut self, call: usize) -> Self {
        self.fail_at = Some(call);
        self
    }

    pub fn calls(&self) -> usize {
        self.cursor
    }
}

impl DetectorBackend for ScriptedBackend {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn detect(&mut self, _pixels: &[u8], _width: u32, _height: u32) -> Result<DetectionResult> {
        let call = self.cursor;
        self.cursor += 1;
        if self.fail_at == Some(call) {
            return Err(anyhow!("scripted detector failure on call {}", call));
        }
        let detections = self.script.get(call).cloned().unwrap_or_default();
        Ok(DetectionResult::new(detections))
    }
}
