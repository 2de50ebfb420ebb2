use rand::Rng;

/// Repeats `samples` until it is `length` long, then truncates. An empty clip
/// becomes silence.
pub fn tile_to_length(samples: &[f32], length: usize) -> Vec<f32> {
    if samples.is_empty() {
        return vec![0.0; length];
    }
    samples.iter().copied().cycle().take(length).collect()
}

/// Cuts a window of exactly `length` samples at a uniformly random offset,
/// tiling first when the clip is too short.
pub fn random_clip<R: Rng + ?Sized>(samples: &[f32], length: usize, rng: &mut R) -> Vec<f32> {
    if samples.len() <= length {
        return tile_to_length(samples, length);
    }
    let start = rng.gen_range(0..=samples.len() - length);
    samples[start..start + length].to_vec()
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;

    #[test]
    fn tile_repeats_and_truncates() {
        assert_eq!(tile_to_length(&[1.0, 2.0, 3.0], 7), vec![1., 2., 3., 1., 2., 3., 1.]);
        assert_eq!(tile_to_length(&[], 3), vec![0.0; 3]);
    }

    #[test]
    fn random_clip_is_a_contiguous_window() {
        let samples: Vec<f32> = (0..100).map(|i| i as f32).collect();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..20 {
            let clip = random_clip(&samples, 10, &mut rng);
            assert_eq!(clip.len(), 10);
            let start = clip[0] as usize;
            assert_eq!(clip, samples[start..start + 10].to_vec());
        }
    }

    #[test]
    fn short_clip_is_tiled_to_length() {
        let mut rng = StdRng::seed_from_u64(0);
        let clip = random_clip(&[0.5, -0.5], 5, &mut rng);
        assert_eq!(clip, vec![0.5, -0.5, 0.5, -0.5, 0.5]);
    }
}
