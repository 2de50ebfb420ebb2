use crate::config::{read_config, SharedConfig};
use crate::error::PredictionError;
use crate::pipeline::scope::{remove_silent_section_slot, ConfigOverride};
use crate::pipeline::traits::{DatasetBuilder, MosDataset};
use crate::types::InputRecord;

/// Builds the dataset for one predict call. When `remove_silent_section` is
/// requested the flag is forced on for construction only; the previous value
/// is back in place before this function returns.
pub(crate) fn build_dataset(
    builder: &dyn DatasetBuilder,
    config: &SharedConfig,
    records: &[InputRecord],
    remove_silent_section: bool,
) -> Result<Box<dyn MosDataset>, PredictionError> {
    let _silence = remove_silent_section
        .then(|| ConfigOverride::install(config, remove_silent_section_slot, Some(true)));
    let snapshot = read_config(config).clone();

    let dataset = builder.build(&snapshot, records, snapshot.phase)?;
    if dataset.len() != records.len() {
        return Err(PredictionError::runtime(
            "build dataset",
            format!(
                "dataset has {} items for {} records",
                dataset.len(),
                records.len()
            ),
        ));
    }
    Ok(dataset)
}
