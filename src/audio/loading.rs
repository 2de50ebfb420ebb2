use std::path::Path;

use rubato::{FastFixedIn, PolynomialDegree, Resampler};

use crate::error::PredictionError;

/// Decodes a WAV file to mono `f32` in `[-1, 1]`, averaging channels.
pub fn read_wav_mono(path: &Path) -> Result<(u32, Vec<f32>), PredictionError> {
    let reader = hound::WavReader::open(path).map_err(|e| PredictionError::runtime("open wav", e))?;
    let spec = reader.spec();
    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<Result<_, _>>()
            .map_err(|e| PredictionError::runtime("decode wav", e))?,
        hound::SampleFormat::Int => {
            let scale = (1u64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<Result<_, _>>()
                .map_err(|e| PredictionError::runtime("decode wav", e))?
        }
    };

    let channels = usize::from(spec.channels.max(1));
    let mono = if channels == 1 {
        interleaved
    } else {
        interleaved
            .chunks_exact(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect()
    };
    Ok((spec.sample_rate, mono))
}

/// Converts mono audio between sample rates. Returns a copy when the rates
/// already match.
pub fn resample(samples: &[f32], from_hz: u32, to_hz: u32) -> Result<Vec<f32>, PredictionError> {
    if from_hz == to_hz || samples.is_empty() {
        return Ok(samples.to_vec());
    }
    if from_hz == 0 || to_hz == 0 {
        return Err(PredictionError::invalid_argument(format!(
            "cannot resample from {from_hz} Hz to {to_hz} Hz"
        )));
    }

    let mut resampler = FastFixedIn::<f32>::new(
        to_hz as f64 / from_hz as f64,
        1.0,
        PolynomialDegree::Septic,
        samples.len(),
        1,
    )
    .map_err(|e| PredictionError::runtime("create resampler", e))?;
    let mut planar = resampler
        .process(&[samples], None)
        .map_err(|e| PredictionError::runtime("resample", e))?;

    let out = planar.pop().unwrap_or_default();
    tracing::debug!(
        from_hz,
        to_hz,
        input_frames = samples.len(),
        output_frames = out.len(),
        "resampled clip"
    );
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_wav(path: &Path, sample_rate: u32, channels: u16, frames: &[i16]) {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).expect("create wav");
        for &s in frames {
            writer.write_sample(s).expect("write sample");
        }
        writer.finalize().expect("finalize wav");
    }

    #[test]
    fn reads_int_wav_as_unit_range() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mono.wav");
        write_wav(&path, 16_000, 1, &[0, 16_384, -32_768]);

        let (rate, samples) = read_wav_mono(&path).unwrap();
        assert_eq!(rate, 16_000);
        assert_eq!(samples, vec![0.0, 0.5, -1.0]);
    }

    #[test]
    fn stereo_is_downmixed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stereo.wav");
        write_wav(&path, 8_000, 2, &[16_384, 0, -16_384, -16_384]);

        let (_, samples) = read_wav_mono(&path).unwrap();
        assert_eq!(samples, vec![0.25, -0.5]);
    }

    #[test]
    fn unreadable_file_is_runtime_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bogus.wav");
        std::fs::write(&path, b"not a wav").unwrap();
        assert!(matches!(
            read_wav_mono(&path).unwrap_err(),
            PredictionError::Runtime { .. }
        ));
    }

    #[test]
    fn resample_scales_length_by_rate_ratio() {
        let input: Vec<f32> = (0..3_200)
            .map(|i| (i as f32 * 440.0 * std::f32::consts::TAU / 16_000.0).sin())
            .collect();
        let out = resample(&input, 16_000, 8_000).unwrap();
        assert!(
            (out.len() as i64 - 1_600).abs() <= 16,
            "unexpected length {}",
            out.len()
        );
        assert_eq!(resample(&input, 16_000, 16_000).unwrap().len(), 3_200);
    }
}
