pub mod audio;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod types;

pub use config::{DatasetConfig, MosConfig, Phase, PredictOptions, Precision, SharedConfig};
pub use error::PredictionError;
pub use pipeline::defaults::WaveformDatasetBuilder;
pub use pipeline::predictor::{predict, MosPredictor};
pub use pipeline::request::{PredictRequest, PredictRequestBuilder};
pub use pipeline::traits::{DatasetBuilder, MosDataset, MosModel};
pub use types::{
    Allowlist, AudioSource, FilePrediction, InputRecord, PredictInput, Prediction,
    TENSOR_INPUT_LABEL,
};
