use std::path::{Path, PathBuf};

use candle_core::Tensor;
use serde::Serialize;

pub const DEFAULT_DATASET_NAME: &str = "sarulab";

/// Label used in place of a path for records that were scored from memory.
pub const TENSOR_INPUT_LABEL: &str = "tensor_input";

#[derive(Debug, Clone)]
pub enum AudioSource {
    File(PathBuf),
    Tensor(Tensor),
}

/// One unit of audio to score.
#[derive(Debug, Clone)]
pub struct InputRecord {
    pub source: AudioSource,
    pub dataset_name: String,
    /// Ground-truth label when known; only used as the label placeholder.
    pub mos: Option<f32>,
}

impl InputRecord {
    pub fn from_file(path: impl Into<PathBuf>, dataset_name: impl Into<String>) -> Self {
        Self {
            source: AudioSource::File(path.into()),
            dataset_name: dataset_name.into(),
            mos: None,
        }
    }

    pub fn from_tensor(audio: Tensor, dataset_name: impl Into<String>) -> Self {
        Self {
            source: AudioSource::Tensor(audio),
            dataset_name: dataset_name.into(),
            mos: None,
        }
    }

    pub fn file_path(&self) -> Option<&Path> {
        match &self.source {
            AudioSource::File(path) => Some(path),
            AudioSource::Tensor(_) => None,
        }
    }

    pub fn audio_tensor(&self) -> Option<&Tensor> {
        match &self.source {
            AudioSource::File(_) => None,
            AudioSource::Tensor(tensor) => Some(tensor),
        }
    }
}

/// The four ways audio can be handed to `predict`. Tensor variants carry the
/// sample rate because in-memory audio has no embedded rate metadata.
#[derive(Debug, Clone)]
pub enum PredictInput {
    File(PathBuf),
    Dir(PathBuf),
    Tensor { audio: Tensor, sample_rate: u32 },
    Tensors { audio: Vec<Tensor>, sample_rate: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    File,
    Dir,
    Tensor,
    Tensors,
}

impl PredictInput {
    pub fn mode(&self) -> InputMode {
        match self {
            Self::File(_) => InputMode::File,
            Self::Dir(_) => InputMode::Dir,
            Self::Tensor { .. } => InputMode::Tensor,
            Self::Tensors { .. } => InputMode::Tensors,
        }
    }

    pub fn sample_rate(&self) -> Option<u32> {
        match self {
            Self::File(_) | Self::Dir(_) => None,
            Self::Tensor { sample_rate, .. } | Self::Tensors { sample_rate, .. } => {
                Some(*sample_rate)
            }
        }
    }
}

/// Filename filter for file and directory inputs. Entries may be bare stems or
/// carry a `.wav` suffix.
#[derive(Debug, Clone, Default)]
pub struct Allowlist {
    pub names: Option<Vec<String>>,
    pub path: Option<PathBuf>,
}

impl Allowlist {
    pub fn is_empty(&self) -> bool {
        self.names.is_none() && self.path.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilePrediction {
    pub file_path: String,
    pub predicted_mos: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Prediction {
    Score(f32),
    Scores(Vec<f32>),
    Files(Vec<FilePrediction>),
}

impl Prediction {
    pub fn as_score(&self) -> Option<f32> {
        match self {
            Self::Score(score) => Some(*score),
            _ => None,
        }
    }

    pub fn as_scores(&self) -> Option<&[f32]> {
        match self {
            Self::Scores(scores) => Some(scores),
            _ => None,
        }
    }

    pub fn as_files(&self) -> Option<&[FilePrediction]> {
        match self {
            Self::Files(files) => Some(files),
            _ => None,
        }
    }
}
