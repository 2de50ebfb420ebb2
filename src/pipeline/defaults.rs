use candle_core::{DType, Device, Tensor};

use crate::audio::clip::random_clip;
use crate::audio::loading::{read_wav_mono, resample};
use crate::audio::silence::remove_silent_sections;
use crate::config::{MosConfig, Phase};
use crate::error::PredictionError;
use crate::pipeline::traits::{DatasetBuilder, MosDataset};
use crate::types::{AudioSource, InputRecord};

/// Default dataset: one fixed-length mono waveform per record.
pub struct WaveformDatasetBuilder;

impl DatasetBuilder for WaveformDatasetBuilder {
    fn build(
        &self,
        config: &MosConfig,
        records: &[InputRecord],
        phase: Phase,
    ) -> Result<Box<dyn MosDataset>, PredictionError> {
        let clip_len = config.clip_len_samples();
        if clip_len == 0 {
            return Err(PredictionError::invalid_argument(format!(
                "clip of {} s at {} Hz has no samples",
                config.dataset.clip_duration_secs, config.sr
            )));
        }
        tracing::debug!(
            records = records.len(),
            sr = config.sr,
            clip_len,
            ?phase,
            remove_silent_section = ?config.dataset.remove_silent_section,
            "building waveform dataset"
        );
        Ok(Box::new(WaveformDataset {
            records: records.to_vec(),
            sample_rate_hz: config.sr,
            clip_len,
            remove_silent_section: config.dataset.remove_silent_section == Some(true),
            silence_frame_ms: config.dataset.silence_frame_ms,
            silence_top_db: config.dataset.silence_top_db,
        }))
    }
}

pub struct WaveformDataset {
    records: Vec<InputRecord>,
    sample_rate_hz: u32,
    clip_len: usize,
    remove_silent_section: bool,
    silence_frame_ms: u32,
    silence_top_db: f32,
}

impl WaveformDataset {
    fn load_samples(&self, record: &InputRecord) -> Result<Vec<f32>, PredictionError> {
        match &record.source {
            AudioSource::File(path) => {
                let (rate, samples) = read_wav_mono(path)?;
                resample(&samples, rate, self.sample_rate_hz)
            }
            AudioSource::Tensor(tensor) => tensor_to_mono(tensor),
        }
    }
}

impl MosDataset for WaveformDataset {
    fn len(&self) -> usize {
        self.records.len()
    }

    fn get(&self, index: usize) -> Result<Vec<Tensor>, PredictionError> {
        let record = self.records.get(index).ok_or_else(|| {
            PredictionError::runtime(
                "dataset index",
                format!("index {index} out of range for {} items", self.records.len()),
            )
        })?;

        let mut samples = self.load_samples(record)?;
        if self.remove_silent_section {
            samples = remove_silent_sections(
                &samples,
                self.sample_rate_hz,
                self.silence_frame_ms,
                self.silence_top_db,
            );
        }
        let clip = random_clip(&samples, self.clip_len, &mut rand::thread_rng());

        let waveform = Tensor::from_vec(clip, self.clip_len, &Device::Cpu)
            .map_err(|e| PredictionError::runtime("tensor creation", e))?;
        let label = Tensor::new(record.mos.unwrap_or(0.0), &Device::Cpu)
            .map_err(|e| PredictionError::runtime("tensor creation", e))?;
        Ok(vec![waveform, label])
    }
}

/// Accepts `[samples]` or channels-first `[channels, samples]` audio.
fn tensor_to_mono(tensor: &Tensor) -> Result<Vec<f32>, PredictionError> {
    let mono = match tensor.rank() {
        1 => Ok(tensor.clone()),
        2 => tensor.mean(0),
        rank => {
            return Err(PredictionError::invalid_argument(format!(
                "audio tensors must be 1-D or [channels, samples], got rank {rank}"
            )))
        }
    }
    .and_then(|t| t.to_dtype(DType::F32))
    .and_then(|t| t.to_device(&Device::Cpu))
    .and_then(|t| t.to_vec1::<f32>())
    .map_err(|e| PredictionError::runtime("read audio tensor", e))?;
    Ok(mono)
}
