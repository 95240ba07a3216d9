//! Batch orchestration: extract, detect, score, report.
//!
//! A run is strictly sequential. Every frame is extracted before the first
//! detector call, and frame `i + 1` is not handed to the detector until frame
//! `i` has been fully processed. The schedule matcher and summary statistics
//! run once, after the whole frame set is finalized.

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::anyhow;

use crate::config::EvalConfig;
use crate::detect::{
    BackendRegistry, Detection, DetectionCriteria, ReplayBackend, StubBackend,
};
use crate::error::PipelineError;
use crate::frame::Frame;
use crate::ground_truth::GroundTruth;
use crate::ingest::{is_synthetic_path, FileConfig, FileSource};
use crate::labels::ClassVocabulary;
use crate::metrics::{
    recorded_confidence, DetectionMatrix, SummaryStatistics, DEFAULT_IOU_THRESHOLD,
};
use crate::results::{write_results, GroundTruthReport, ResultsRecord, TrackPoint};
use crate::schedule::{generate_schedule, ScheduleMatcher};
use crate::stability::{BoxStabilityFilter, Observation};

/// Configured detection run over one video at a time.
pub struct Pipeline {
    config: EvalConfig,
    vocab: ClassVocabulary,
    registry: BackendRegistry,
}

impl Pipeline {
    /// Build the detector registry named by `config` over the COCO vocabulary.
    pub fn new(config: EvalConfig) -> Result<Self, PipelineError> {
        let vocab = ClassVocabulary::coco();
        let registry = build_registry(&config, &vocab).map_err(PipelineError::Config)?;
        Ok(Self::with_registry(config, vocab, registry))
    }

    /// Use a caller-assembled registry. Detection runs on its default backend.
    pub fn with_registry(
        config: EvalConfig,
        vocab: ClassVocabulary,
        registry: BackendRegistry,
    ) -> Self {
        Self {
            config,
            vocab,
            registry,
        }
    }

    pub fn config(&self) -> &EvalConfig {
        &self.config
    }

    pub fn registry(&self) -> &BackendRegistry {
        &self.registry
    }

    /// Process `video_path` end to end and return the results record.
    ///
    /// Nothing is written to disk. A detector failure aborts the run and
    /// every frame processed so far is dropped.
    pub fn run(&self, video_path: &str) -> Result<ResultsRecord, PipelineError> {
        let started = Instant::now();

        if !is_synthetic_path(video_path) && !Path::new(video_path).is_file() {
            return Err(PipelineError::VideoNotFound(PathBuf::from(video_path)));
        }

        let ground_truth = match &self.config.ground_truth_path {
            Some(path) => Some(GroundTruth::from_path(path).map_err(PipelineError::Config)?),
            None => None,
        };

        let criteria = DetectionCriteria::new(
            &self.vocab,
            &self.config.detection.target_label,
            self.config.detection.threshold,
        );

        let mut source = FileSource::new(FileConfig {
            path: video_path.to_string(),
            fps_interval: self.config.sampling.fps_interval,
        })
        .map_err(PipelineError::Extraction)?;
        source.connect().map_err(PipelineError::Extraction)?;
        let extraction = source.extract().map_err(PipelineError::Extraction)?;
        let stats = source.stats();
        log::debug!(
            "{}: {} frames decoded, {} sampled",
            stats.path,
            stats.frames_decoded,
            stats.frames_sampled
        );
        if extraction.frames.is_empty() {
            return Err(PipelineError::NoFrames(video_path.to_string()));
        }
        log::info!(
            "extracted {} frames from {} ({:.1}s at {:.2} fps)",
            extraction.frames.len(),
            video_path,
            extraction.duration_seconds,
            extraction.source_fps
        );

        let mut schedule = generate_schedule(
            extraction.duration_seconds,
            self.config.schedule.num_trains,
            self.config.schedule.tolerance_secs,
        );
        for entry in &schedule {
            log::info!(
                "train {} expected at {} (+/- {}s)",
                entry.train_id,
                entry.expected_timestamp,
                entry.tolerance
            );
        }

        log::info!(
            "detecting with backend '{}'",
            self.registry.default_name().unwrap_or("none")
        );
        self.registry
            .warm_up()
            .map_err(|cause| PipelineError::Detector {
                frame: "warm-up".to_string(),
                cause,
            })?;

        let mut frames = Vec::with_capacity(extraction.frames.len());
        let mut train_frames = Vec::new();
        let mut matrix = ground_truth
            .as_ref()
            .map(|_| DetectionMatrix::new(self.vocab.clone()));
        let mut tracker = BoxStabilityFilter::new(self.config.stability);
        let mut track = Vec::new();

        for sampled in &extraction.frames {
            let result = self
                .registry
                .detect(
                    sampled.image.pixels(),
                    sampled.image.width,
                    sampled.image.height,
                )
                .map_err(|cause| PipelineError::Detector {
                    frame: sampled.name.clone(),
                    cause,
                })?;
            log::debug!(
                "{}: {} detections",
                sampled.name,
                result.detections.len()
            );

            let frame = Frame::new(sampled.index, sampled.timestamp_seconds, result.detections);

            if let (Some(matrix), Some(truth)) = (matrix.as_mut(), ground_truth.as_ref()) {
                matrix.update_detections(
                    &frame.detections,
                    truth.for_frame(frame.index),
                    DEFAULT_IOU_THRESHOLD,
                );
            }

            let observation = best_target(&frame.detections, &criteria)
                .map(|det| Observation::new(det.bbox, det.confidence));
            if let Some(bbox) = tracker.update(observation) {
                track.push(TrackPoint {
                    frame: frame.index,
                    timestamp_seconds: frame.timestamp_seconds,
                    phase: tracker.phase(),
                    bbox,
                    alpha: tracker.alpha(),
                });
            }

            let qualifying: Vec<Detection> = frame
                .detections
                .iter()
                .filter(|det| criteria.qualifies(det))
                .map(|det| Detection {
                    confidence: recorded_confidence(det.confidence) as f32,
                    ..det.clone()
                })
                .collect();
            if !qualifying.is_empty() {
                train_frames.push(frame.with_detections(qualifying));
            }

            frames.push(frame);
        }

        ScheduleMatcher::new(criteria.clone()).apply(&mut schedule, &frames);
        for entry in &schedule {
            if entry.detected {
                log::info!(
                    "train {} detected (confidence {:.2})",
                    entry.train_id,
                    entry.confidence
                );
            } else {
                log::info!("train {} not detected", entry.train_id);
            }
        }

        let statistics = SummaryStatistics::compute(
            &frames,
            frames.len(),
            extraction.duration_seconds,
            &criteria,
        )
        .with_timing(started.elapsed().as_secs_f64(), frames.len());

        Ok(ResultsRecord {
            train_frames,
            statistics,
            video_path: video_path.to_string(),
            schedule,
            ground_truth: matrix.as_ref().map(GroundTruthReport::from),
            stabilized_track: track,
        })
    }

    /// `run`, then write the record into the configured results directory.
    pub fn run_and_save(&self, video_path: &str) -> Result<(ResultsRecord, PathBuf), PipelineError> {
        let record = self.run(video_path)?;
        let path = write_results(&self.config.results_dir, &record).map_err(PipelineError::Results)?;
        log::info!("results written to {}", path.display());
        Ok((record, path))
    }
}

/// Run detection on `video_path` with `config` and persist the results record.
pub fn run_detection(config: &EvalConfig, video_path: &str) -> Result<ResultsRecord, PipelineError> {
    let pipeline = Pipeline::new(config.clone())?;
    pipeline.run_and_save(video_path).map(|(record, _)| record)
}

/// Registry holding `stub` plus the backend `config` selects, with that one as default.
#[cfg_attr(not(feature = "backend-tract"), allow(unused_variables))]
pub fn build_registry(
    config: &EvalConfig,
    vocab: &ClassVocabulary,
) -> anyhow::Result<BackendRegistry> {
    let mut registry = BackendRegistry::new();
    registry.register(StubBackend::new().with_label(config.detection.target_label.clone()));

    match config.detection.backend.as_str() {
        "stub" => {}
        "replay" => {
            let path = config
                .detection
                .replay_path
                .as_deref()
                .ok_or_else(|| anyhow!("backend 'replay' needs a replay_path"))?;
            registry.register(ReplayBackend::from_path(path)?);
        }
        #[cfg(feature = "backend-tract")]
        "tract" => {
            let path = config
                .detection
                .model_path
                .as_deref()
                .ok_or_else(|| anyhow!("backend 'tract' needs a model_path"))?;
            registry.register(crate::detect::TractBackend::new(path, vocab.clone())?);
        }
        #[cfg(not(feature = "backend-tract"))]
        "tract" => {
            return Err(anyhow!(
                "backend 'tract' requires the backend-tract feature"
            ));
        }
        _ => {}
    }
    // Unknown names fall through to set_default, which lists what is available.
    registry.set_default(&config.detection.backend)?;
    Ok(registry)
}

/// Highest-confidence target-class detection, regardless of threshold.
fn best_target<'a>(
    detections: &'a [Detection],
    criteria: &DetectionCriteria,
) -> Option<&'a Detection> {
    detections
        .iter()
        .filter(|det| criteria.is_target(det))
        .max_by(|a, b| a.confidence.total_cmp(&b.confidence))
}
