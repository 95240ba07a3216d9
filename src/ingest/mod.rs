//! Frame ingestion.
//!
//! Sources turn a video into an ordered list of `SampledFrame`s taken at a
//! fixed time interval, together with the video duration:
//! - Synthetic `stub://` videos (tests, demos)
//! - Local video files (feature: ingest-file-ffmpeg)
//!
//! Extraction completes before detection begins. Sources only read local
//! paths; remote URLs are rejected.

pub mod file;
#[cfg(feature = "ingest-file-ffmpeg")]
pub(crate) mod file_ffmpeg;
mod sampling;

pub use file::{is_synthetic_path, Extraction, FileConfig, FileSource, FileStats, SyntheticVideo};
pub use sampling::FrameSampler;
