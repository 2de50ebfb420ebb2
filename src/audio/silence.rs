/// Drops frames whose RMS is more than `top_db` below the loudest frame and
/// joins what is left. Clips that are silent throughout are returned as-is.
pub fn remove_silent_sections(
    samples: &[f32],
    sample_rate_hz: u32,
    frame_ms: u32,
    top_db: f32,
) -> Vec<f32> {
    if samples.is_empty() || sample_rate_hz == 0 {
        return samples.to_vec();
    }
    let frame_len = ((sample_rate_hz as u64 * frame_ms as u64) / 1000).max(1) as usize;

    let frame_rms: Vec<f32> = samples.chunks(frame_len).map(rms).collect();
    let peak = frame_rms.iter().copied().fold(0.0f32, f32::max);
    if peak <= 0.0 {
        return samples.to_vec();
    }
    let threshold = peak * 10f32.powf(-top_db / 20.0);

    let kept: Vec<f32> = samples
        .chunks(frame_len)
        .zip(&frame_rms)
        .filter(|(_, &level)| level >= threshold)
        .flat_map(|(chunk, _)| chunk.iter().copied())
        .collect();

    tracing::debug!(
        input_samples = samples.len(),
        kept_samples = kept.len(),
        frame_len,
        "removed silent sections"
    );
    if kept.is_empty() {
        samples.to_vec()
    } else {
        kept
    }
}

fn rms(chunk: &[f32]) -> f32 {
    let mean_sq = chunk.iter().map(|&x| (x as f64) * (x as f64)).sum::<f64>() / chunk.len() as f64;
    mean_sq.sqrt() as f32
}
