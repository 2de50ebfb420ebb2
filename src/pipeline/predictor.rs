use crate::config::parse_device;
use crate::error::PredictionError;
use crate::pipeline::dataset::build_dataset;
use crate::pipeline::defaults::WaveformDatasetBuilder;
use crate::pipeline::inputs::normalize_inputs;
use crate::pipeline::loader::BatchLoader;
use crate::pipeline::request::PredictRequest;
use crate::pipeline::runner::{run_inference, InferenceSettings};
use crate::pipeline::scope::{sample_rate_slot, ConfigOverride};
use crate::pipeline::shaper::shape_prediction;
use crate::pipeline::traits::{DatasetBuilder, MosModel};
use crate::types::Prediction;

/// Scores audio with a MOS model. Owns the model and the dataset builder
/// that turns records into model features.
pub struct MosPredictor<M: MosModel> {
    model: M,
    dataset_builder: Box<dyn DatasetBuilder>,
}

impl<M: MosModel> MosPredictor<M> {
    pub fn new(model: M) -> Self {
        Self {
            model,
            dataset_builder: Box::new(WaveformDatasetBuilder),
        }
    }

    pub fn with_dataset_builder(mut self, dataset_builder: Box<dyn DatasetBuilder>) -> Self {
        self.dataset_builder = dataset_builder;
        self
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn into_model(self) -> M {
        self.model
    }

    pub fn predict(&mut self, request: PredictRequest) -> Result<Prediction, PredictionError> {
        predict(&mut self.model, self.dataset_builder.as_ref(), request)
    }
}

/// Runs one prediction. Configuration overrides installed here are undone
/// before returning, on success and on error alike.
pub fn predict(
    model: &mut dyn MosModel,
    dataset_builder: &dyn DatasetBuilder,
    request: PredictRequest,
) -> Result<Prediction, PredictionError> {
    request.validate()?;
    let PredictRequest {
        input,
        allowlist,
        dataset_name,
        options,
    } = request;
    let device = parse_device(&options.device)?;

    let config = model.config();
    let _sample_rate = input.sample_rate().map(|sample_rate| {
        tracing::debug!(sample_rate, "overriding configured sample rate for tensor input");
        ConfigOverride::install(&config, sample_rate_slot, sample_rate)
    });

    let records = normalize_inputs(&input, &allowlist, &dataset_name)?;
    tracing::info!(
        mode = ?input.mode(),
        records = records.len(),
        device = %options.device,
        repetitions = options.num_repetitions,
        "predicting MOS"
    );

    let dataset = build_dataset(
        dataset_builder,
        &config,
        &records,
        options.remove_silent_section,
    )?;
    let loader = BatchLoader::new(dataset.as_ref(), options.batch_size, options.num_workers)?;
    let settings = InferenceSettings {
        device,
        num_repetitions: options.num_repetitions,
        precision: options.precision,
        verbose: options.verbose,
    };
    let scores = run_inference(model, &loader, &settings)?;

    shape_prediction(input.mode(), &records, scores)
}
