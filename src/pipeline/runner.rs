use candle_core::{DType, Device, Tensor};
use indicatif::{ProgressBar, ProgressStyle};

use crate::config::Precision;
use crate::error::PredictionError;
use crate::pipeline::loader::BatchLoader;
use crate::pipeline::traits::MosModel;

#[derive(Debug, Clone)]
pub struct InferenceSettings {
    pub device: Device,
    pub num_repetitions: usize,
    pub precision: Precision,
    pub verbose: bool,
}

/// Runs every batch through the model `num_repetitions` times and returns the
/// per-item mean score, in dataset order.
pub fn run_inference(
    model: &mut dyn MosModel,
    loader: &BatchLoader<'_>,
    settings: &InferenceSettings,
) -> Result<Vec<f32>, PredictionError> {
    if settings.num_repetitions == 0 {
        return Err(PredictionError::invalid_argument(
            "num_repetitions must be at least 1",
        ));
    }

    model.eval();
    let requested = settings.precision.compute_dtype(&settings.device);
    model.to_device(&settings.device, requested)?;
    let dtype = model.dtype();
    if dtype != requested {
        tracing::debug!(?requested, ?dtype, "model kept its own weight dtype");
    }

    let num_items = loader.num_items();
    let weight = 1.0 / settings.num_repetitions as f32;
    let mut mean = vec![0.0f32; num_items];

    for repetition in 0..settings.num_repetitions {
        let progress = progress_bar(loader.len(), repetition, settings);
        let mut scores = Vec::with_capacity(num_items);
        loader.for_each_batch(|batch| {
            scores.extend(score_batch(model, &batch, &settings.device, dtype)?);
            progress.inc(1);
            Ok(())
        })?;
        progress.finish_and_clear();

        if scores.len() != num_items {
            return Err(PredictionError::runtime(
                "collect predictions",
                format!("model produced {} scores for {num_items} items", scores.len()),
            ));
        }
        for (acc, score) in mean.iter_mut().zip(scores) {
            *acc += score * weight;
        }
        tracing::debug!(
            repetition = repetition + 1,
            total = settings.num_repetitions,
            "prediction pass complete"
        );
    }

    Ok(mean)
}

fn score_batch(
    model: &dyn MosModel,
    batch: &[Tensor],
    device: &Device,
    dtype: DType,
) -> Result<Vec<f32>, PredictionError> {
    let Some((_label, features)) = batch.split_last() else {
        return Err(PredictionError::runtime("split batch", "empty batch"));
    };
    if features.is_empty() {
        return Err(PredictionError::runtime(
            "split batch",
            "dataset items need at least one feature tensor before the label",
        ));
    }

    let features = features
        .iter()
        .map(|t| to_compute(t, device, dtype))
        .collect::<Result<Vec<_>, _>>()?;

    let output = model.forward(&features)?;
    let output = match output.rank() {
        2 => output.squeeze(1),
        1 => Ok(output),
        rank => {
            return Err(PredictionError::runtime(
                "squeeze scores",
                format!("expected model output of shape [batch, 1], got rank {rank}"),
            ))
        }
    }
    .and_then(|t| t.to_dtype(DType::F32))
    .and_then(|t| t.to_device(&Device::Cpu))
    .map_err(|e| PredictionError::runtime("squeeze scores", e))?;

    output
        .to_vec1::<f32>()
        .map_err(|e| PredictionError::runtime("to_vec1", e))
}

/// Moves a feature tensor to the compute device and casts floating features
/// to the model's weight dtype. Integer features pass through unchanged.
fn to_compute(tensor: &Tensor, device: &Device, dtype: DType) -> Result<Tensor, PredictionError> {
    let moved = tensor
        .to_device(device)
        .map_err(|e| PredictionError::runtime("move features to device", e))?;
    let floating = matches!(
        moved.dtype(),
        DType::F16 | DType::BF16 | DType::F32 | DType::F64
    );
    if !floating || moved.dtype() == dtype {
        return Ok(moved);
    }
    moved
        .to_dtype(dtype)
        .map_err(|e| PredictionError::runtime("cast features to model dtype", e))
}

fn progress_bar(num_batches: usize, repetition: usize, settings: &InferenceSettings) -> ProgressBar {
    if !settings.verbose {
        return ProgressBar::hidden();
    }
    let progress = ProgressBar::new(num_batches as u64);
    progress.set_style(
        ProgressStyle::with_template("{prefix}: [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} ({eta})")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-"),
    );
    progress.set_prefix(progress_label(repetition, settings.num_repetitions));
    progress
}

fn progress_label(repetition: usize, num_repetitions: usize) -> String {
    if num_repetitions > 1 {
        format!("Predicting [{}/{num_repetitions}]", repetition + 1)
    } else {
        "Predicting".to_string()
    }
}
