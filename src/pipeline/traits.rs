use candle_core::{DType, Device, Tensor};

use crate::config::{MosConfig, Phase, SharedConfig};
use crate::error::PredictionError;
use crate::types::InputRecord;

/// A pretrained MOS model as seen by the prediction pipeline.
pub trait MosModel {
    /// Handle to the configuration the model was built with. Predict calls
    /// override fields on it for their own duration only.
    fn config(&self) -> SharedConfig;

    fn eval(&mut self);

    /// Moves the weights to `device`, converting floating weights to `dtype`
    /// when the model can run in it.
    fn to_device(&mut self, device: &Device, dtype: DType) -> Result<(), PredictionError>;

    /// Floating dtype of the weights after `to_device`. Features are cast to
    /// it before every forward pass.
    fn dtype(&self) -> DType {
        DType::F32
    }

    /// Scores one batch of features. The result has shape `[batch, 1]`.
    fn forward(&self, features: &[Tensor]) -> Result<Tensor, PredictionError>;
}

pub trait DatasetBuilder: Send + Sync {
    fn build(
        &self,
        config: &MosConfig,
        records: &[InputRecord],
        phase: Phase,
    ) -> Result<Box<dyn MosDataset>, PredictionError>;
}

/// Indexable dataset. Every item is `(features..., label)`: the last tensor is
/// a label placeholder that never reaches the model.
pub trait MosDataset: Send + Sync {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn get(&self, index: usize) -> Result<Vec<Tensor>, PredictionError>;
}
