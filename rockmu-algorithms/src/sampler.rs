//! Spill-size sampling.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Poisson};
use std::f64::consts::PI;

/// Means below this use the multiplication method.
const DIRECT_METHOD_LIMIT: f64 = 30.0;

/// Means at or above this use a normal approximation; the rejection sampler
/// covers the range in between.
const NORMAL_APPROX_LIMIT: f64 = 1.0e9;

/// Source of spill sizes (number of events per spill).
///
/// Draws are strictly sequential; spill boundaries depend on draw order.
pub trait SpillSizeSampler {
    /// Draws the size of the next spill for the given mean.
    fn sample(&mut self, mean: f64) -> usize;
}

impl<S: SpillSizeSampler + ?Sized> SpillSizeSampler for &mut S {
    fn sample(&mut self, mean: f64) -> usize {
        (**self).sample(mean)
    }
}

/// Poisson-distributed spill sizes from a seedable generator.
#[derive(Debug, Clone)]
pub struct PoissonSampler<R = ChaCha8Rng> {
    rng: R,
}

impl PoissonSampler<ChaCha8Rng> {
    /// Creates a reproducible sampler from a seed.
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }
}

impl<R: Rng> PoissonSampler<R> {
    /// Wraps an existing generator.
    pub fn from_rng(rng: R) -> Self {
        Self { rng }
    }

    /// Draws `k ~ Poisson(mean)`.
    ///
    /// Exact below 1e9: the multiplication method for small means and
    /// `rand_distr`'s rejection sampler above it. Non-positive or NaN means
    /// yield 0.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn poisson(&mut self, mean: f64) -> u64 {
        if mean.is_nan() || mean <= 0.0 {
            return 0;
        }
        if mean.is_infinite() {
            return u64::MAX;
        }
        if mean < DIRECT_METHOD_LIMIT {
            // Multiply uniforms until the product drops below e^-mean.
            let limit = (-mean).exp();
            let mut k = 0u64;
            let mut p = 1.0;
            loop {
                p *= self.rng.gen::<f64>();
                if p <= limit {
                    return k;
                }
                k += 1;
            }
        }
        if mean < NORMAL_APPROX_LIMIT {
            return Poisson::<f64>::new(mean).map_or(0, |dist| {
                let k: f64 = dist.sample(&mut self.rng);
                k as u64
            });
        }
        let draw = mean + mean.sqrt() * self.standard_normal();
        draw.max(0.0).round() as u64
    }

    /// Box-Muller standard normal.
    fn standard_normal(&mut self) -> f64 {
        let u1 = self.rng.gen::<f64>().max(1e-300);
        let u2 = self.rng.gen::<f64>();
        (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
    }
}

impl<R: Rng> SpillSizeSampler for PoissonSampler<R> {
    fn sample(&mut self, mean: f64) -> usize {
        usize::try_from(self.poisson(mean)).unwrap_or(usize::MAX)
    }
}
