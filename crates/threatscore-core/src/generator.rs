//! Synthetic risk samples for a department.
//!
//! Samples are drawn uniformly from `[max(mean - variance, 0), min(mean + variance + 1, MAX_SCORE))`.
//! The exclusive upper edge means a generated sample never reaches `MAX_SCORE` itself.

use rand::distributions::{Distribution, Uniform};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::ops::Range;
use tracing::debug;

use crate::error::{Error, Result};
use crate::types::{DepartmentDataset, RiskSample, MAX_SCORE};

/// Half-open sampling interval for the given mean and spread.
pub fn sampling_range(mean: i64, variance: i64) -> Result<Range<i64>> {
    let lower = mean.saturating_sub(variance).max(0);
    let upper = mean.saturating_add(variance).saturating_add(1).min(i64::from(MAX_SCORE));
    if lower >= upper {
        return Err(Error::InvalidRange(format!(
            "mean {} and variance {} give empty interval [{}, {})",
            mean, variance, lower, upper
        )));
    }
    Ok(lower..upper)
}

pub struct SampleGenerator<R = StdRng> {
    rng: R,
}

impl SampleGenerator<StdRng> {
    pub fn from_entropy() -> Self {
        Self { rng: StdRng::from_entropy() }
    }

    /// Reproducible generator for test harnesses.
    pub fn seeded(seed: u64) -> Self {
        Self { rng: StdRng::seed_from_u64(seed) }
    }
}

impl<R: Rng> SampleGenerator<R> {
    pub fn with_rng(rng: R) -> Self {
        Self { rng }
    }

    pub fn generate(&mut self, mean: i64, variance: i64, count: usize) -> Result<Vec<RiskSample>> {
        if count == 0 {
            return Err(Error::InvalidRange("sample count must be at least 1".to_string()));
        }
        let range = sampling_range(mean, variance)?;
        debug!(mean, variance, count, lower = range.start, upper = range.end, "generating samples");
        let dist = Uniform::from(range);
        dist.sample_iter(&mut self.rng).take(count).map(RiskSample::new).collect()
    }

    pub fn generate_dataset(
        &mut self,
        department: impl Into<String>,
        mean: i64,
        variance: i64,
        count: usize,
    ) -> Result<DepartmentDataset> {
        let samples = self.generate(mean, variance, count)?;
        Ok(DepartmentDataset::new(department, samples))
    }
}
