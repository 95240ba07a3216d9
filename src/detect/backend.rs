use anyhow::Result;

use crate::detect::result::DetectionResult;

/// Detector backend trait.
///
/// The detector is an opaque, synchronous collaborator: the pipeline hands it
/// one frame at a time and waits. A hung call blocks the run; callers that need
/// a deadline must wrap the backend themselves.
///
/// Errors are not swallowed by the pipeline. A failure on any frame aborts the
/// run and no partial results are kept.
pub trait DetectorBackend: Send {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Run detection on an RGB24 frame.
    ///
    /// Implementations must treat the pixel slice as read-only.
    fn detect(&mut self, pixels: &[u8], width: u32, height: u32) -> Result<DetectionResult>;

    /// Optional warm-up hook.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}
