//! Sample configuration and pixel augmentation.

use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

/// Additive Gaussian pixel noise.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NoiseConfig {
    /// Standard deviation in normalized pixel units.
    pub sigma: f32,
    /// Seed for the noise generator; `None` draws from the OS.
    pub seed: Option<u64>,
}

impl Default for NoiseConfig {
    fn default() -> Self {
        Self {
            sigma: 0.1,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// Resize every frame to (width, height); `None` keeps the stored size.
    pub target_size: Option<(u32, u32)>,
    pub noise: Option<NoiseConfig>,
}

/// Add zero-mean Gaussian noise with std `sigma` to every element, then clip to [0, 1].
///
/// The clip runs even when `sigma` is zero, so the output range always holds.
pub fn add_gaussian_noise<R: Rng + ?Sized>(buf: &mut [f32], sigma: f32, rng: &mut R) {
    let normal = match Normal::new(0.0f32, sigma.abs()) {
        Ok(normal) if sigma.is_finite() && sigma != 0.0 => normal,
        // Zero or non-finite sigma: clip only.
        _ => {
            for v in buf.iter_mut() {
                *v = v.clamp(0.0, 1.0);
            }
            return;
        }
    };
    for v in buf.iter_mut() {
        *v = (*v + normal.sample(rng)).clamp(0.0, 1.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn noise_output_stays_in_unit_range() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut buf: Vec<f32> = (0..1001).map(|i| (i % 11) as f32 / 10.0).collect();
        add_gaussian_noise(&mut buf, 0.5, &mut rng);
        assert!(buf.iter().all(|v| (0.0..=1.0).contains(v)));
    }

    #[test]
    fn noise_changes_pixels_and_is_roughly_centered() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut buf = vec![0.5f32; 20_000];
        add_gaussian_noise(&mut buf, 0.1, &mut rng);
        let mean = buf.iter().sum::<f32>() / buf.len() as f32;
        let var = buf.iter().map(|v| (v - mean).powi(2)).sum::<f32>() / buf.len() as f32;
        assert!((mean - 0.5).abs() < 0.01, "mean {mean}");
        assert!((var.sqrt() - 0.1).abs() < 0.01, "std {}", var.sqrt());
    }

    #[test]
    fn same_seed_gives_same_noise() {
        let noisy = |seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut buf = vec![0.5f32; 64];
            add_gaussian_noise(&mut buf, 0.2, &mut rng);
            buf
        };
        assert_eq!(noisy(3), noisy(3));
        assert_ne!(noisy(3), noisy(4));
    }

    #[test]
    fn non_finite_sigma_only_clips() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut buf = vec![-0.2, 0.3, 1.4];
        add_gaussian_noise(&mut buf, f32::NAN, &mut rng);
        assert_eq!(buf, vec![0.0, 0.3, 1.0]);
    }

    #[test]
    fn zero_sigma_only_clips() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut buf = vec![-0.2, 0.3, 1.4];
        add_gaussian_noise(&mut buf, 0.0, &mut rng);
        assert_eq!(buf, vec![0.0, 0.3, 1.0]);
    }
}
