use std::path::PathBuf;

/// Why a run failed.
///
/// Input errors (`VideoNotFound`, `NoFrames`, `Config`) are raised before any
/// detection work. `Detector` aborts the run mid-way and discards every frame
/// processed so far. Degenerate inputs (zero duration, no detections) are not
/// errors; they produce zero-valued results.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("video file not found at {}", .0.display())]
    VideoNotFound(PathBuf),

    #[error("no frames could be extracted from {0}")]
    NoFrames(String),

    #[error("invalid configuration: {0:#}")]
    Config(anyhow::Error),

    #[error("frame extraction failed: {0:#}")]
    Extraction(anyhow::Error),

    #[error("detector failed on {frame}: {cause:#}")]
    Detector { frame: String, cause: anyhow::Error },

    #[error("failed to write results: {0:#}")]
    Results(anyhow::Error),
}

impl PipelineError {
    /// True for failures caused by what the caller passed in.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::VideoNotFound(_) | Self::NoFrames(_) | Self::Config(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn messages_and_classification() {
        let err = PipelineError::VideoNotFound(PathBuf::from("uploads/missing.mp4"));
        assert_eq!(err.to_string(), "video file not found at uploads/missing.mp4");
        assert!(err.is_input_error());

        let err = PipelineError::Detector {
            frame: "frame_0003".to_string(),
            cause: anyhow!("inference timed out"),
        };
        assert_eq!(
            err.to_string(),
            "detector failed on frame_0003: inference timed out"
        );
        assert!(!err.is_input_error());
    }
}
