use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use candle_core::{DType, Device};
use serde::{Deserialize, Serialize};

use crate::error::PredictionError;

/// Configuration shared between a model and every predict call made on it.
///
/// A predict call overrides fields for its own duration and restores them on
/// exit, so one config serves one predict at a time. Predictors that run on
/// separate threads need a config each; sharing one lets a restore from one
/// call land in the middle of another.
pub type SharedConfig = Arc<RwLock<MosConfig>>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Train,
    Valid,
    #[default]
    Test,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MosConfig {
    #[serde(default = "default_sr")]
    pub sr: u32,
    #[serde(default)]
    pub phase: Phase,
    #[serde(default)]
    pub dataset: DatasetConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// `None` means the flag was never configured.
    #[serde(default)]
    pub remove_silent_section: Option<bool>,
    #[serde(default = "default_clip_duration_secs")]
    pub clip_duration_secs: f32,
    #[serde(default = "default_silence_top_db")]
    pub silence_top_db: f32,
    #[serde(default = "default_silence_frame_ms")]
    pub silence_frame_ms: u32,
}

fn default_sr() -> u32 {
    MosConfig::DEFAULT_SAMPLE_RATE_HZ
}
fn default_clip_duration_secs() -> f32 {
    3.0
}
fn default_silence_top_db() -> f32 {
    30.0
}
fn default_silence_frame_ms() -> u32 {
    32
}

impl MosConfig {
    pub const DEFAULT_SAMPLE_RATE_HZ: u32 = 16_000;

    pub fn load(path: &Path) -> Result<Self, PredictionError> {
        let data = std::fs::read_to_string(path)
            .map_err(|e| PredictionError::io("read config.json", e))?;
        serde_json::from_str(&data).map_err(|e| PredictionError::json("parse config.json", e))
    }

    pub fn into_shared(self) -> SharedConfig {
        Arc::new(RwLock::new(self))
    }

    /// Number of samples in one model input clip at the configured rate.
    pub fn clip_len_samples(&self) -> usize {
        (self.dataset.clip_duration_secs * self.sr as f32).round() as usize
    }
}

impl Default for MosConfig {
    fn default() -> Self {
        Self {
            sr: Self::DEFAULT_SAMPLE_RATE_HZ,
            phase: Phase::default(),
            dataset: DatasetConfig::default(),
        }
    }
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            remove_silent_section: None,
            clip_duration_secs: default_clip_duration_secs(),
            silence_top_db: default_silence_top_db(),
            silence_frame_ms: default_silence_frame_ms(),
        }
    }
}

// A panic while holding the lock cannot leave a half-written field behind:
// every writer replaces whole values.
pub(crate) fn read_config(config: &SharedConfig) -> RwLockReadGuard<'_, MosConfig> {
    config.read().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) fn write_config(config: &SharedConfig) -> RwLockWriteGuard<'_, MosConfig> {
    config.write().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Precision {
    /// Always run the forward pass in `f32`.
    Full,
    /// Request `f16` on CUDA devices; `f32` elsewhere.
    #[default]
    Mixed,
}

impl Precision {
    /// Dtype requested from the model when it is moved to `device`. The model
    /// decides what it actually holds; see [`crate::MosModel::dtype`].
    pub fn compute_dtype(self, device: &Device) -> DType {
        match self {
            Precision::Mixed if device.is_cuda() => DType::F16,
            _ => DType::F32,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PredictOptions {
    pub device: String,
    pub num_workers: usize,
    pub batch_size: usize,
    pub num_repetitions: usize,
    pub remove_silent_section: bool,
    pub verbose: bool,
    pub precision: Precision,
}

impl Default for PredictOptions {
    fn default() -> Self {
        Self {
            device: "cpu".to_string(),
            num_workers: 4,
            batch_size: 16,
            num_repetitions: 1,
            remove_silent_section: true,
            verbose: true,
            precision: Precision::default(),
        }
    }
}

impl PredictOptions {
    pub(crate) fn validate(&self) -> Result<(), PredictionError> {
        if self.batch_size == 0 {
            return Err(PredictionError::invalid_argument(
                "batch_size must be at least 1",
            ));
        }
        if self.num_repetitions == 0 {
            return Err(PredictionError::invalid_argument(
                "num_repetitions must be at least 1",
            ));
        }
        Ok(())
    }
}

/// Accepts `cpu`, `cuda`, `cuda:N`, `metal` and `metal:N`.
pub fn parse_device(name: &str) -> Result<Device, PredictionError> {
    let (kind, ordinal) = match name.split_once(':') {
        Some((kind, ordinal)) => {
            let ordinal = ordinal.parse::<usize>().map_err(|_| {
                PredictionError::invalid_argument(format!("invalid device ordinal in `{name}`"))
            })?;
            (kind, ordinal)
        }
        None => (name, 0),
    };
    match kind {
        "cpu" => Ok(Device::Cpu),
        "cuda" => Device::new_cuda(ordinal).map_err(|e| PredictionError::runtime("CUDA init", e)),
        "metal" => {
            Device::new_metal(ordinal).map_err(|e| PredictionError::runtime("Metal init", e))
        }
        other => Err(PredictionError::invalid_argument(format!(
            "unknown device `{other}`"
        ))),
    }
}
