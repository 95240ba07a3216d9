//! Railwatch
//!
//! Offline train-arrival evaluation for a single video.
//!
//! # Architecture
//!
//! A run is a single-threaded batch pipeline:
//!
//! 1. **Extract**: sample frames at a fixed interval, fully, before any inference.
//! 2. **Detect**: hand each frame to a detector backend, strictly in order.
//! 3. **Score**: match qualifying detections against a synthetic arrival schedule,
//!    aggregate summary statistics, and (when annotations are given) score against ground truth.
//! 4. **Report**: write one JSON results record, replacing the previous one.
//!
//! # Module Structure
//!
//! - `geometry`: bounding boxes and IoU
//! - `labels`: class vocabulary passed explicitly to label-aware components
//! - `detect`: detector trait, backends, registry, qualifying criteria
//! - `frame`: sampled frames and their detections
//! - `ingest`: frame sources (synthetic `stub://`, local files)
//! - `metrics`: IoU-matched TP/FP/FN accumulator and summary statistics
//! - `stability`: per-object box stabilizer
//! - `schedule`: expected arrivals and matching
//! - `ground_truth`, `results`, `pipeline`, `config`, `error`

pub mod config;
pub mod detect;
pub mod error;
pub mod frame;
pub mod geometry;
pub mod ground_truth;
pub mod ingest;
pub mod labels;
pub mod metrics;
pub mod pipeline;
pub mod results;
pub mod schedule;
pub mod stability;

pub use config::EvalConfig;
pub use detect::{BackendRegistry, Detection, DetectionCriteria, DetectionResult, DetectorBackend};
pub use error::PipelineError;
pub use frame::{format_timestamp, Frame, FrameImage, SampledFrame};
pub use geometry::{iou, BoundingBox};
pub use ground_truth::GroundTruth;
pub use ingest::{FileConfig, FileSource};
pub use labels::ClassVocabulary;
pub use metrics::{DetectionMatrix, LabeledBox, MatchStrategy, SummaryStatistics};
pub use pipeline::{run_detection, Pipeline};
pub use results::{write_results, ResultsRecord, RESULTS_FILE_NAME};
pub use schedule::{generate_schedule, ScheduleEntry, ScheduleMatcher};
pub use stability::{BoxStabilityFilter, StabilityConfig, TrackPhase};
