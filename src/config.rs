use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::detect::{DEFAULT_TARGET_LABEL, DEFAULT_THRESHOLD};
use crate::schedule::{DEFAULT_NUM_TRAINS, DEFAULT_TOLERANCE_SECS};
use crate::stability::StabilityConfig;

const DEFAULT_BACKEND: &str = "stub";
const DEFAULT_FPS_INTERVAL: f64 = 1.0;
const DEFAULT_RESULTS_DIR: &str = "results";

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct EvalConfigFile {
    detection: Option<DetectionConfigFile>,
    sampling: Option<SamplingConfigFile>,
    schedule: Option<ScheduleConfigFile>,
    stability: Option<StabilityConfigFile>,
    output: Option<OutputConfigFile>,
    ground_truth_path: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct DetectionConfigFile {
    threshold: Option<f32>,
    target_label: Option<String>,
    backend: Option<String>,
    model_path: Option<PathBuf>,
    replay_path: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct SamplingConfigFile {
    fps_interval: Option<f64>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct ScheduleConfigFile {
    num_trains: Option<usize>,
    tolerance_secs: Option<f64>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct StabilityConfigFile {
    max_history: Option<usize>,
    lock_threshold: Option<f32>,
    stability_threshold: Option<u32>,
    max_fade: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct OutputConfigFile {
    results_dir: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct EvalConfig {
    pub detection: DetectionSettings,
    pub sampling: SamplingSettings,
    pub schedule: ScheduleSettings,
    pub stability: StabilityConfig,
    pub results_dir: PathBuf,
    pub ground_truth_path: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct DetectionSettings {
    pub threshold: f32,
    pub target_label: String,
    /// Registry name of the detector: `stub`, `replay` or `tract`.
    pub backend: String,
    pub model_path: Option<PathBuf>,
    pub replay_path: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct SamplingSettings {
    /// Seconds of video between sampled frames.
    pub fps_interval: f64,
}

#[derive(Debug, Clone)]
pub struct ScheduleSettings {
    pub num_trains: usize,
    pub tolerance_secs: f64,
}

impl EvalConfig {
    /// Defaults, then the file named by `RAILWATCH_CONFIG`, then `RAILWATCH_*` env overrides.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("RAILWATCH_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) if !path.trim().is_empty() => Some(read_config_file(Path::new(path))?),
            _ => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: EvalConfigFile) -> Self {
        let detection = file.detection.unwrap_or_default();
        let sampling = file.sampling.unwrap_or_default();
        let schedule = file.schedule.unwrap_or_default();
        let stability = file.stability.unwrap_or_default();
        let stability_defaults = StabilityConfig::default();

        Self {
            detection: DetectionSettings {
                threshold: detection.threshold.unwrap_or(DEFAULT_THRESHOLD),
                target_label: detection
                    .target_label
                    .unwrap_or_else(|| DEFAULT_TARGET_LABEL.to_string()),
                backend: detection
                    .backend
                    .unwrap_or_else(|| DEFAULT_BACKEND.to_string()),
                model_path: detection.model_path,
                replay_path: detection.replay_path,
            },
            sampling: SamplingSettings {
                fps_interval: sampling.fps_interval.unwrap_or(DEFAULT_FPS_INTERVAL),
            },
            schedule: ScheduleSettings {
                num_trains: schedule.num_trains.unwrap_or(DEFAULT_NUM_TRAINS),
                tolerance_secs: schedule.tolerance_secs.unwrap_or(DEFAULT_TOLERANCE_SECS),
            },
            stability: StabilityConfig {
                max_history: stability
                    .max_history
                    .unwrap_or(stability_defaults.max_history),
                lock_threshold: stability
                    .lock_threshold
                    .unwrap_or(stability_defaults.lock_threshold),
                stability_threshold: stability
                    .stability_threshold
                    .unwrap_or(stability_defaults.stability_threshold),
                max_fade: stability.max_fade.unwrap_or(stability_defaults.max_fade),
            },
            results_dir: file
                .output
                .and_then(|output| output.results_dir)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_RESULTS_DIR)),
            ground_truth_path: file.ground_truth_path,
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Some(threshold) = env_parsed::<f32>("RAILWATCH_THRESHOLD")? {
            self.detection.threshold = threshold;
        }
        if let Some(label) = env_nonempty("RAILWATCH_TARGET_LABEL") {
            self.detection.target_label = label;
        }
        if let Some(backend) = env_nonempty("RAILWATCH_BACKEND") {
            self.detection.backend = backend;
        }
        if let Some(path) = env_nonempty("RAILWATCH_MODEL_PATH") {
            self.detection.model_path = Some(PathBuf::from(path));
        }
        if let Some(path) = env_nonempty("RAILWATCH_REPLAY_PATH") {
            self.detection.replay_path = Some(PathBuf::from(path));
        }
        if let Some(interval) = env_parsed::<f64>("RAILWATCH_FPS_INTERVAL")? {
            self.sampling.fps_interval = interval;
        }
        if let Some(count) = env_parsed::<usize>("RAILWATCH_NUM_TRAINS")? {
            self.schedule.num_trains = count;
        }
        if let Some(tolerance) = env_parsed::<f64>("RAILWATCH_TOLERANCE_SECS")? {
            self.schedule.tolerance_secs = tolerance;
        }
        if let Some(dir) = env_nonempty("RAILWATCH_RESULTS_DIR") {
            self.results_dir = PathBuf::from(dir);
        }
        if let Some(path) = env_nonempty("RAILWATCH_GROUND_TRUTH") {
            self.ground_truth_path = Some(PathBuf::from(path));
        }
        Ok(())
    }

    /// Check ranges. Public so callers can re-check after applying CLI overrides.
    pub fn validate(&mut self) -> Result<()> {
        self.detection.target_label = self.detection.target_label.trim().to_string();
        self.detection.backend = self.detection.backend.trim().to_lowercase();

        if self.detection.target_label.is_empty() {
            return Err(anyhow!("target_label must not be empty"));
        }
        if !(0.0..=1.0).contains(&self.detection.threshold) {
            return Err(anyhow!(
                "threshold must be within [0, 1], got {}",
                self.detection.threshold
            ));
        }
        if !(0.0..=1.0).contains(&self.stability.lock_threshold) {
            return Err(anyhow!(
                "stability.lock_threshold must be within [0, 1], got {}",
                self.stability.lock_threshold
            ));
        }
        if self.sampling.fps_interval.is_nan() || self.sampling.fps_interval <= 0.0 {
            return Err(anyhow!("fps_interval must be greater than zero"));
        }
        if self.schedule.tolerance_secs.is_nan() || self.schedule.tolerance_secs < 0.0 {
            return Err(anyhow!("tolerance_secs must not be negative"));
        }
        if self.stability.max_history == 0 {
            return Err(anyhow!("stability.max_history must be at least 1"));
        }
        if self.stability.max_fade == 0 {
            return Err(anyhow!("stability.max_fade must be at least 1"));
        }
        Ok(())
    }
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self::from_file(EvalConfigFile::default())
    }
}

fn read_config_file(path: &Path) -> Result<EvalConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let is_toml = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("toml"))
        .unwrap_or(false);
    let cfg = if is_toml {
        toml::from_str(&raw).map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    } else {
        serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    };
    Ok(cfg)
}

fn env_nonempty(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn env_parsed<T: std::str::FromStr>(key: &str) -> Result<Option<T>> {
    match env_nonempty(key) {
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| anyhow!("{} must be a number, got {:?}", key, raw)),
        None => Ok(None),
    }
}
