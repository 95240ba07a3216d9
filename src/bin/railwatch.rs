//! railwatch - Evaluate train arrivals in a recorded video.
//!
//! 1. Samples frames from the video at a fixed interval
//! 2. Runs the selected detector on every sampled frame
//! 3. Matches train sightings against an evenly spaced expected schedule
//! 4. Writes `detection_results.json` into the results directory

use anyhow::{anyhow, Result};
use clap::Parser;
use std::io::IsTerminal;
use std::path::PathBuf;

use railwatch::{write_results, EvalConfig, Pipeline, ResultsRecord};

#[path = "../ui.rs"]
mod ui;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Detect trains in a video and score them against an expected schedule"
)]
struct Args {
    /// Video to analyze: a local file, or `stub://name?duration=&fps=&trains=&dwell=`.
    video_path: String,

    /// Minimum confidence for a train detection.
    #[arg(long)]
    threshold: Option<f32>,

    /// Seconds of video between sampled frames.
    #[arg(long)]
    fps_interval: Option<f64>,

    /// Number of expected arrivals to spread over the video.
    #[arg(long)]
    num_trains: Option<usize>,

    /// Half-width of each arrival window, in seconds.
    #[arg(long)]
    tolerance: Option<f64>,

    /// Detector backend (stub|replay|tract).
    #[arg(long)]
    backend: Option<String>,

    /// ONNX model for the tract backend.
    #[arg(long, value_name = "PATH")]
    model: Option<PathBuf>,

    /// Per-frame detections JSON for the replay backend.
    #[arg(long, value_name = "PATH")]
    replay: Option<PathBuf>,

    /// Ground-truth annotations JSON; adds precision/recall against real boxes.
    #[arg(long, value_name = "PATH")]
    ground_truth: Option<PathBuf>,

    /// Directory receiving detection_results.json.
    #[arg(long, value_name = "DIR")]
    results_dir: Option<PathBuf>,

    /// UI mode for stderr progress (auto|plain|pretty).
    #[arg(long, default_value = "auto", value_name = "MODE")]
    ui: String,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let mode = ui::UiMode::parse(&args.ui)
        .ok_or_else(|| anyhow!("--ui must be one of auto, plain, pretty"))?;
    let is_tty = std::io::stderr().is_terminal();
    let stdout_is_tty = std::io::stdout().is_terminal();
    let ui = ui::Ui::new(mode, is_tty, !stdout_is_tty);

    let stage = ui.stage("Load configuration");
    let config = load_config(&args)?;
    stage.done();

    let stage = ui.stage("Prepare detector");
    let pipeline = Pipeline::new(config)?;
    stage.done();

    let stage = ui.stage("Extract frames and detect");
    let record = pipeline.run(&args.video_path)?;
    stage.done();

    let stage = ui.stage("Write results");
    let path = write_results(&pipeline.config().results_dir, &record)?;
    stage.done();

    print_summary(&record);
    println!("results: {}", path.display());
    Ok(())
}

fn load_config(args: &Args) -> Result<EvalConfig> {
    let mut config = EvalConfig::load()?;
    if let Some(threshold) = args.threshold {
        config.detection.threshold = threshold;
    }
    if let Some(interval) = args.fps_interval {
        config.sampling.fps_interval = interval;
    }
    if let Some(count) = args.num_trains {
        config.schedule.num_trains = count;
    }
    if let Some(tolerance) = args.tolerance {
        config.schedule.tolerance_secs = tolerance;
    }
    if let Some(backend) = &args.backend {
        config.detection.backend = backend.clone();
    }
    if let Some(path) = &args.model {
        config.detection.model_path = Some(path.clone());
    }
    if let Some(path) = &args.replay {
        config.detection.replay_path = Some(path.clone());
    }
    if let Some(path) = &args.ground_truth {
        config.ground_truth_path = Some(path.clone());
    }
    if let Some(dir) = &args.results_dir {
        config.results_dir = dir.clone();
    }
    config.validate()?;
    Ok(config)
}

fn print_summary(record: &ResultsRecord) {
    let stats = &record.statistics;
    println!("video: {}", record.video_path);
    println!(
        "frames: {} sampled, {} with trains ({:.2}%)",
        stats.total_frames, stats.frames_with_trains, stats.detection_rate
    );
    println!(
        "confidence: {:.2} avg, precision {:.2}, recall {:.2} (placeholder), f1 {:.2}",
        stats.avg_confidence, stats.precision, stats.recall, stats.f1_score
    );
    println!(
        "duration: {:.1}s, {:.1} trains/hour, {:.2} frames/s",
        stats.duration_seconds, stats.trains_per_hour, stats.detection_fps
    );

    let detected = record.schedule.iter().filter(|e| e.detected).count();
    println!("schedule: {}/{} arrivals detected", detected, record.schedule.len());
    for entry in &record.schedule {
        if entry.detected {
            println!(
                "  train {} @ {}: detected (confidence {:.2})",
                entry.train_id, entry.expected_timestamp, entry.confidence
            );
        } else {
            println!(
                "  train {} @ {}: missed",
                entry.train_id, entry.expected_timestamp
            );
        }
    }

    if let Some(gt) = &record.ground_truth {
        println!(
            "ground truth: precision {:.3}, recall {:.3}, f1 {:.3} (tp {}, fp {}, fn {})",
            gt.precision,
            gt.recall,
            gt.f1_score,
            gt.true_positives,
            gt.false_positives,
            gt.false_negatives
        );
    }
}
