//! Local file frame source.
//!
//! `FileSource` turns a local video into an ordered list of timestamped frames,
//! sampled at a fixed interval. Extraction runs to completion before any
//! detection starts.
//!
//! Backends:
//! - `stub://` paths render a synthetic video in memory (tests, demos)
//! - anything else is decoded with FFmpeg (feature: ingest-file-ffmpeg)

use anyhow::{anyhow, Result};

#[cfg(feature = "ingest-file-ffmpeg")]
use super::file_ffmpeg::FfmpegFileSource;
use super::sampling::FrameSampler;
use crate::frame::{FrameImage, SampledFrame};

const SYNTHETIC_WIDTH: u32 = 32;
const SYNTHETIC_HEIGHT: u32 = 24;
const SYNTHETIC_BRIGHT: u8 = 230;
const SYNTHETIC_DARK: u8 = 20;
/// Upper bound on `duration * fps` for a synthetic video.
const MAX_SYNTHETIC_FRAMES: f64 = 1_000_000.0;

/// Configuration for a local file source.
#[derive(Clone, Debug)]
pub struct FileConfig {
    /// Local file path (e.g., "uploads/platform_3.mp4") or a `stub://` URI.
    pub path: String,
    /// Seconds between sampled frames.
    pub fps_interval: f64,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            path: String::new(),
            fps_interval: 1.0,
        }
    }
}

/// Output of a full extraction pass.
#[derive(Debug)]
pub struct Extraction {
    /// Sampled frames in timestamp order.
    pub frames: Vec<SampledFrame>,
    pub duration_seconds: f64,
    /// Container frame rate.
    pub source_fps: f64,
}

/// Local file frame source.
pub struct FileSource {
    backend: FileBackend,
}

enum FileBackend {
    Synthetic(SyntheticFileSource),
    #[cfg(feature = "ingest-file-ffmpeg")]
    Ffmpeg(FfmpegFileSource),
}

impl FileSource {
    pub fn new(config: FileConfig) -> Result<Self> {
        if !is_local_file_path(&config.path) {
            return Err(anyhow!(
                "file ingestion only supports local paths (no URL schemes)"
            ));
        }
        if config.fps_interval.is_nan() || config.fps_interval <= 0.0 {
            return Err(anyhow!("fps_interval must be greater than zero"));
        }
        if is_synthetic_path(&config.path) {
            Ok(Self {
                backend: FileBackend::Synthetic(SyntheticFileSource::new(config)?),
            })
        } else {
            #[cfg(feature = "ingest-file-ffmpeg")]
            {
                Ok(Self {
                    backend: FileBackend::Ffmpeg(FfmpegFileSource::new(config)?),
                })
            }
            #[cfg(not(feature = "ingest-file-ffmpeg"))]
            {
                Err(anyhow!(
                    "decoding video files requires the ingest-file-ffmpeg feature"
                ))
            }
        }
    }

    /// Connect to the file source.
    pub fn connect(&mut self) -> Result<()> {
        match &mut self.backend {
            FileBackend::Synthetic(source) => source.connect(),
            #[cfg(feature = "ingest-file-ffmpeg")]
            FileBackend::Ffmpeg(source) => source.connect(),
        }
    }

    /// Decode the whole video and return the sampled frames.
    pub fn extract(&mut self) -> Result<Extraction> {
        match &mut self.backend {
            FileBackend::Synthetic(source) => source.extract(),
            #[cfg(feature = "ingest-file-ffmpeg")]
            FileBackend::Ffmpeg(source) => source.extract(),
        }
    }

    /// Get frame statistics.
    pub fn stats(&self) -> FileStats {
        match &self.backend {
            FileBackend::Synthetic(source) => source.stats(),
            #[cfg(feature = "ingest-file-ffmpeg")]
            FileBackend::Ffmpeg(source) => source.stats(),
        }
    }
}

/// Statistics for a file source.
#[derive(Clone, Debug)]
pub struct FileStats {
    pub frames_decoded: u64,
    pub frames_sampled: usize,
    pub path: String,
}

pub fn is_synthetic_path(path: &str) -> bool {
    path.starts_with("stub://")
}

// ----------------------------------------------------------------------------
// Synthetic source (stub://) for tests
// ----------------------------------------------------------------------------

/// Parameters of a synthetic video, parsed from
/// `stub://<name>?duration=<s>&fps=<n>&trains=<t1,t2>&dwell=<s>`.
#[derive(Clone, Debug, PartialEq)]
pub struct SyntheticVideo {
    pub duration_secs: f64,
    pub fps: f64,
    /// Arrival times of synthetic trains, in seconds.
    pub trains: Vec<f64>,
    /// How long each train stays in view, in seconds.
    pub dwell_secs: f64,
}

impl Default for SyntheticVideo {
    fn default() -> Self {
        Self {
            duration_secs: 120.0,
            fps: 10.0,
            trains: vec![30.0, 60.0, 90.0],
            dwell_secs: 4.0,
        }
    }
}

impl SyntheticVideo {
    pub fn parse(path: &str) -> Result<Self> {
        let rest = path
            .strip_prefix("stub://")
            .ok_or_else(|| anyhow!("not a synthetic path: {}", path))?;
        let mut video = Self::default();
        let Some((_, query)) = rest.split_once('?') else {
            return Ok(video);
        };
        for pair in query.split('&').filter(|p| !p.is_empty()) {
            let (key, value) = pair
                .split_once('=')
                .ok_or_else(|| anyhow!("malformed synthetic parameter '{}'", pair))?;
            match key {
                "duration" => video.duration_secs = parse_number(key, value)?,
                "fps" => video.fps = parse_number(key, value)?,
                "dwell" => video.dwell_secs = parse_number(key, value)?,
                "trains" => {
                    video.trains = value
                        .split(',')
                        .map(str::trim)
                        .filter(|v| !v.is_empty())
                        .map(|v| parse_number(key, v))
                        .collect::<Result<_>>()?;
                }
                other => return Err(anyhow!("unknown synthetic parameter '{}'", other)),
            }
        }
        if video.duration_secs < 0.0 || video.fps < 0.0 || video.dwell_secs < 0.0 {
            return Err(anyhow!("synthetic parameters must be non-negative"));
        }
        if video.duration_secs * video.fps > MAX_SYNTHETIC_FRAMES {
            return Err(anyhow!(
                "synthetic video too long: {}s at {} fps exceeds {} frames",
                video.duration_secs,
                video.fps,
                MAX_SYNTHETIC_FRAMES
            ));
        }
        Ok(video)
    }

    fn train_present(&self, t: f64) -> bool {
        self.trains
            .iter()
            .any(|&start| t >= start && t < start + self.dwell_secs)
    }
}

fn parse_number(key: &str, value: &str) -> Result<f64> {
    let number: f64 = value
        .trim()
        .parse()
        .map_err(|_| anyhow!("synthetic parameter '{}' must be a number, got '{}'", key, value))?;
    if !number.is_finite() {
        return Err(anyhow!("synthetic parameter '{}' must be finite, got '{}'", key, value));
    }
    Ok(number)
}

struct SyntheticFileSource {
    config: FileConfig,
    video: SyntheticVideo,
    sampler: FrameSampler,
}

impl SyntheticFileSource {
    fn new(config: FileConfig) -> Result<Self> {
        let video = SyntheticVideo::parse(&config.path)?;
        let sampler = FrameSampler::new(video.fps, config.fps_interval);
        Ok(Self {
            config,
            video,
            sampler,
        })
    }

    fn connect(&mut self) -> Result<()> {
        log::info!("FileSource: connected to {} (synthetic)", self.config.path);
        Ok(())
    }

    fn extract(&mut self) -> Result<Extraction> {
        self.sampler = FrameSampler::new(self.video.fps, self.config.fps_interval);
        let total = (self.video.duration_secs * self.video.fps).round() as u64;
        let mut frames = Vec::new();
        for _ in 0..total {
            if let Some((index, ts)) = self.sampler.offer() {
                frames.push(SampledFrame::new(index, ts, self.render(ts)));
            }
        }
        Ok(Extraction {
            frames,
            duration_seconds: self.sampler.duration_seconds(),
            source_fps: self.video.fps,
        })
    }

    fn render(&self, t: f64) -> FrameImage {
        let level = if self.video.train_present(t) {
            SYNTHETIC_BRIGHT
        } else {
            SYNTHETIC_DARK
        };
        let len = (SYNTHETIC_WIDTH * SYNTHETIC_HEIGHT * 3) as usize;
        FrameImage::new(vec![level; len], SYNTHETIC_WIDTH, SYNTHETIC_HEIGHT)
    }

    fn stats(&self) -> FileStats {
        FileStats {
            frames_decoded: self.sampler.decoded(),
            frames_sampled: self.sampler.kept(),
            path: self.config.path.clone(),
        }
    }
}

fn is_local_file_path(path: &str) -> bool {
    if path.trim().is_empty() {
        return false;
    }
    if is_synthetic_path(path) {
        return true;
    }
    !path.contains("://")
}
