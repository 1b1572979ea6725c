//! Department and organization score aggregation.
//!
//! Every result is clamped into `[0, MAX_SCORE]`; with in-domain inputs the
//! clamp never changes the value.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::{AggregatedScore, DepartmentDataset, DepartmentScore, RiskSample};

/// Arithmetic mean of a department's samples.
pub fn department_score(dataset: &DepartmentDataset) -> Result<DepartmentScore> {
    score_samples(&dataset.department, &dataset.samples)
}

pub fn score_samples(department: &str, samples: &[RiskSample]) -> Result<DepartmentScore> {
    if samples.is_empty() {
        return Err(Error::EmptyDataset(format!("department '{}' has no samples", department)));
    }
    let sum: f64 = samples.iter().map(|s| f64::from(s.value())).sum();
    Ok(DepartmentScore::new(sum / samples.len() as f64))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregationMode {
    Weighted,
    Unweighted,
}

/// How department scores combine into the organization score.
#[derive(Debug, Clone, PartialEq)]
pub enum Aggregation {
    /// Importance weights, one per department, in department order.
    Weighted(Vec<f64>),
    Unweighted,
}

impl Aggregation {
    pub fn mode(&self) -> AggregationMode {
        match self {
            Aggregation::Weighted(_) => AggregationMode::Weighted,
            Aggregation::Unweighted => AggregationMode::Unweighted,
        }
    }

    pub fn aggregate(&self, scores: &[DepartmentScore]) -> Result<AggregatedScore> {
        match self {
            Aggregation::Weighted(weights) => weighted_mean(scores, weights),
            Aggregation::Unweighted => unweighted_mean(scores),
        }
    }
}

/// `clamp(Σ score_i * weight_i / Σ weight_i, 0, MAX_SCORE)`.
pub fn weighted_mean(scores: &[DepartmentScore], weights: &[f64]) -> Result<AggregatedScore> {
    if scores.len() != weights.len() {
        return Err(Error::InvalidWeights(format!(
            "{} department scores but {} weights",
            scores.len(),
            weights.len()
        )));
    }
    if let Some(w) = weights.iter().find(|w| !w.is_finite() || **w < 0.0) {
        return Err(Error::InvalidWeights(format!("weight {} is not a finite non-negative number", w)));
    }
    // Rescale by the largest weight so huge finite weights cannot overflow the sums.
    let largest = weights.iter().copied().fold(0.0_f64, f64::max);
    if largest <= 0.0 {
        return Err(Error::InvalidWeights("total weight must be positive".to_string()));
    }
    let total: f64 = weights.iter().map(|w| w / largest).sum();
    let weighted: f64 = scores.iter().zip(weights).map(|(s, w)| s.value() * (w / largest)).sum();
    if !weighted.is_finite() || !total.is_finite() {
        return Err(Error::InvalidWeights("weighted sum is not finite".to_string()));
    }
    Ok(AggregatedScore::new(weighted / total))
}

pub fn unweighted_mean(scores: &[DepartmentScore]) -> Result<AggregatedScore> {
    if scores.is_empty() {
        return Err(Error::EmptyDataset("no department scores to aggregate".to_string()));
    }
    let sum: f64 = scores.iter().map(|s| s.value()).sum();
    Ok(AggregatedScore::new(sum / scores.len() as f64))
}
