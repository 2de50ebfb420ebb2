use std::path::Path;

use crate::error::PredictionError;
use crate::types::{FilePrediction, InputMode, InputRecord, Prediction, TENSOR_INPUT_LABEL};

pub(crate) fn shape_prediction(
    mode: InputMode,
    records: &[InputRecord],
    scores: Vec<f32>,
) -> Result<Prediction, PredictionError> {
    if scores.len() != records.len() {
        return Err(PredictionError::runtime(
            "shape prediction",
            format!("{} scores for {} records", scores.len(), records.len()),
        ));
    }

    match mode {
        InputMode::File | InputMode::Tensor => scores
            .first()
            .copied()
            .map(Prediction::Score)
            .ok_or_else(|| PredictionError::runtime("shape prediction", "no score produced")),
        InputMode::Tensors => Ok(Prediction::Scores(scores)),
        InputMode::Dir => Ok(Prediction::Files(
            records
                .iter()
                .zip(scores)
                .map(|(record, predicted_mos)| FilePrediction {
                    file_path: record
                        .file_path()
                        .map(posix_string)
                        .unwrap_or_else(|| TENSOR_INPUT_LABEL.to_string()),
                    predicted_mos,
                })
                .collect(),
        )),
    }
}

/// Renders a path with `/` separators regardless of platform.
fn posix_string(path: &Path) -> String {
    let rendered = path.to_string_lossy();
    if std::path::MAIN_SEPARATOR == '/' {
        rendered.into_owned()
    } else {
        rendered.replace(std::path::MAIN_SEPARATOR, "/")
    }
}
