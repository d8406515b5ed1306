use crate::DataPointsFilter;
use cv_core::{Error, PointCloud, Result};
use log::*;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;

/// Keeps every point independently with probability `prob`.
///
/// The generator is seeded from `seed` on every call, so filtering the same cloud twice gives the
/// same result.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RandomSamplingDataPointsFilter {
    prob: f64,
    seed: u64,
}

impl RandomSamplingDataPointsFilter {
    /// Creates a `RandomSamplingDataPointsFilter` with default values.
    ///
    /// Same as calling [`Default::default`].
    pub fn new() -> Self {
        Default::default()
    }

    /// Set the probability that a point is kept.
    ///
    /// Must be in `(0, 1]`. Default is `0.75`.
    #[must_use]
    pub fn prob(self, prob: f64) -> Self {
        Self { prob, ..self }
    }

    /// Set the seed of the sampling generator.
    ///
    /// Default is `0`.
    #[must_use]
    pub fn seed(self, seed: u64) -> Self {
        Self { seed, ..self }
    }
}

impl Default for RandomSamplingDataPointsFilter {
    fn default() -> Self {
        Self {
            prob: 0.75,
            seed: 0,
        }
    }
}

impl DataPointsFilter for RandomSamplingDataPointsFilter {
    fn filter(&self, cloud: &PointCloud) -> Result<PointCloud> {
        if !(self.prob > 0.0 && self.prob <= 1.0) {
            return Err(Error::InvalidParameter(format!(
                "sampling probability must be in (0, 1], got {}",
                self.prob
            )));
        }
        let mut rng = Pcg64::seed_from_u64(self.seed);
        let sampled: PointCloud = cloud
            .points()
            .iter()
            .filter(|_| rng.gen_bool(self.prob))
            .copied()
            .collect();
        trace!(
            "random sampling kept {} of {} points",
            sampled.len(),
            cloud.len()
        );
        Ok(sampled)
    }
}
