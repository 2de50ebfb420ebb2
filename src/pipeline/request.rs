use std::path::PathBuf;

use candle_core::Tensor;

use crate::config::PredictOptions;
use crate::error::PredictionError;
use crate::types::{Allowlist, PredictInput, DEFAULT_DATASET_NAME};

#[derive(Debug, Clone)]
pub struct PredictRequest {
    pub input: PredictInput,
    pub allowlist: Allowlist,
    pub dataset_name: String,
    pub options: PredictOptions,
}

impl PredictRequest {
    pub fn new(input: PredictInput) -> Self {
        Self {
            input,
            allowlist: Allowlist::default(),
            dataset_name: DEFAULT_DATASET_NAME.to_string(),
            options: PredictOptions::default(),
        }
    }

    pub fn builder() -> PredictRequestBuilder {
        PredictRequestBuilder::default()
    }

    pub fn with_allowlist(mut self, allowlist: Allowlist) -> Self {
        self.allowlist = allowlist;
        self
    }

    pub fn with_dataset_name(mut self, dataset_name: impl Into<String>) -> Self {
        self.dataset_name = dataset_name.into();
        self
    }

    pub fn with_options(mut self, options: PredictOptions) -> Self {
        self.options = options;
        self
    }

    pub(crate) fn validate(&self) -> Result<(), PredictionError> {
        if self.input.sample_rate() == Some(0) {
            return Err(PredictionError::invalid_argument(
                "sample_rate must be positive",
            ));
        }
        self.options.validate()
    }
}

/// Keyword-style request assembly: every selector is optional here and
/// `build` checks that exactly one was given. Setters carry the keyword names
/// (`input_path`, `val_list`, ...) behind a `with_` prefix.
#[derive(Debug, Clone, Default)]
pub struct PredictRequestBuilder {
    input_path: Option<PathBuf>,
    input_dir: Option<PathBuf>,
    input_tensor: Option<Tensor>,
    input_tensors: Option<Vec<Tensor>>,
    sample_rate: Option<u32>,
    allowlist: Allowlist,
    dataset_name: Option<String>,
    options: PredictOptions,
}

impl PredictRequestBuilder {
    pub fn with_input_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.input_path = Some(path.into());
        self
    }

    pub fn with_input_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.input_dir = Some(dir.into());
        self
    }

    pub fn with_input_tensor(mut self, audio: Tensor) -> Self {
        self.input_tensor = Some(audio);
        self
    }

    pub fn with_input_tensors(mut self, audio: Vec<Tensor>) -> Self {
        self.input_tensors = Some(audio);
        self
    }

    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = Some(sample_rate);
        self
    }

    pub fn with_val_list<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowlist.names = Some(names.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_val_list_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.allowlist.path = Some(path.into());
        self
    }

    pub fn with_predict_dataset(mut self, dataset_name: impl Into<String>) -> Self {
        self.dataset_name = Some(dataset_name.into());
        self
    }

    pub fn with_options(mut self, options: PredictOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_device(mut self, device: impl Into<String>) -> Self {
        self.options.device = device.into();
        self
    }

    pub fn with_num_workers(mut self, num_workers: usize) -> Self {
        self.options.num_workers = num_workers;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.options.batch_size = batch_size;
        self
    }

    pub fn with_num_repetitions(mut self, num_repetitions: usize) -> Self {
        self.options.num_repetitions = num_repetitions;
        self
    }

    pub fn with_remove_silent_section(mut self, remove_silent_section: bool) -> Self {
        self.options.remove_silent_section = remove_silent_section;
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.options.verbose = verbose;
        self
    }

    pub fn build(self) -> Result<PredictRequest, PredictionError> {
        let supplied = [
            self.input_path.is_some(),
            self.input_dir.is_some(),
            self.input_tensor.is_some(),
            self.input_tensors.is_some(),
        ]
        .into_iter()
        .filter(|&s| s)
        .count();
        if supplied != 1 {
            return Err(PredictionError::invalid_argument(format!(
                "exactly one of `input_path`, `input_dir`, `input_tensor`, or `input_tensors` \
                 must be provided (got {supplied})"
            )));
        }

        let input = if let Some(path) = self.input_path {
            PredictInput::File(path)
        } else if let Some(dir) = self.input_dir {
            PredictInput::Dir(dir)
        } else {
            let sample_rate = self.sample_rate.ok_or_else(|| {
                PredictionError::invalid_argument(
                    "sample_rate must be provided when using input_tensor or input_tensors",
                )
            })?;
            match (self.input_tensor, self.input_tensors) {
                (Some(audio), _) => PredictInput::Tensor { audio, sample_rate },
                (None, Some(audio)) => PredictInput::Tensors { audio, sample_rate },
                (None, None) => {
                    return Err(PredictionError::invalid_argument("no valid input provided"))
                }
            }
        };

        let request = PredictRequest {
            input,
            allowlist: self.allowlist,
            dataset_name: self
                .dataset_name
                .unwrap_or_else(|| DEFAULT_DATASET_NAME.to_string()),
            options: self.options,
        };
        request.validate()?;
        Ok(request)
    }
}
