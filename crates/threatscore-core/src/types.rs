//! Domain types shared by the generator, stores, cache and orchestrator.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;

use crate::error::{Error, Result};

/// Upper edge of the risk score domain. Samples and scores live in `[0, MAX_SCORE]`.
pub const MAX_SCORE: u32 = 90;

/// Name of the single numeric field every store document carries.
pub const SCORE_FIELD: &str = "score";

/// Default cap for `query_all`; large enough for a whole department in one call.
pub const DEFAULT_MAX_RESULTS: usize = 10_000;

/// One user's risk reading. Always within `[0, MAX_SCORE]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RiskSample(u32);

impl RiskSample {
    pub fn new(value: i64) -> Result<Self> {
        match u32::try_from(value) {
            Ok(v) if v <= MAX_SCORE => Ok(Self(v)),
            _ => Err(Error::OutOfDomain(value)),
        }
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl TryFrom<i64> for RiskSample {
    type Error = Error;

    fn try_from(value: i64) -> Result<Self> {
        Self::new(value)
    }
}

impl From<RiskSample> for i64 {
    fn from(sample: RiskSample) -> Self {
        i64::from(sample.0)
    }
}

impl fmt::Display for RiskSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// The samples of one department, in generation order.
///
/// Generation parameters (mean, variance) are not part of the dataset, so a
/// copy reloaded from the cache compares equal to the one that was written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepartmentDataset {
    pub department: String,
    pub samples: Vec<RiskSample>,
}

impl DepartmentDataset {
    pub fn new(department: impl Into<String>, samples: Vec<RiskSample>) -> Self {
        Self { department: department.into(), samples }
    }

    /// Build a dataset from raw integers, rejecting anything outside the domain.
    pub fn from_raw<I>(department: impl Into<String>, values: I) -> Result<Self>
    where
        I: IntoIterator<Item = i64>,
    {
        let samples = values.into_iter().map(RiskSample::new).collect::<Result<Vec<_>>>()?;
        Ok(Self::new(department, samples))
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Raw values as pushed to a document store.
    pub fn values(&self) -> Vec<i64> {
        self.samples.iter().map(|s| i64::from(*s)).collect()
    }
}

/// Mean score of one department, in `[0, MAX_SCORE]`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct DepartmentScore(f64);

impl DepartmentScore {
    /// Clamps into the score domain.
    pub fn new(value: f64) -> Self {
        Self(clamp_to_domain(value))
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

/// Organization-wide score, in `[0, MAX_SCORE]`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct AggregatedScore(f64);

impl AggregatedScore {
    /// Clamps into the score domain.
    pub fn new(value: f64) -> Self {
        Self(clamp_to_domain(value))
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl fmt::Display for AggregatedScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

/// NaN has no place in the score domain and maps to 0.
pub(crate) fn clamp_to_domain(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, f64::from(MAX_SCORE))
}

/// Field types a document store index can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Integer,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMapping {
    pub name: String,
    pub field_type: FieldType,
}

/// Mapping requested by `ensure_index`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSchema {
    pub fields: Vec<FieldMapping>,
}

impl IndexSchema {
    /// The single integer `score` field used for risk samples.
    pub fn score() -> Self {
        Self { fields: vec![FieldMapping { name: SCORE_FIELD.to_string(), field_type: FieldType::Integer }] }
    }

    pub fn has_field(&self, name: &str, field_type: FieldType) -> bool {
        self.fields.iter().any(|f| f.name == name && f.field_type == field_type)
    }
}

impl Default for IndexSchema {
    fn default() -> Self {
        Self::score()
    }
}

/// Where a department's samples live inside a document store.
///
/// Document ids are the positions `0..documents` of the batch that was indexed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexHandle {
    pub index_name: String,
    pub documents: u64,
}

impl IndexHandle {
    pub fn doc_ids(&self) -> Range<u64> {
        0..self.documents
    }
}

/// Validate an index name: non-empty, lowercase ASCII alphanumerics, `-` or `_`.
pub fn validate_index_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && !name.starts_with(['-', '_'])
        && name.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(Error::InvalidConfig(format!("invalid index name '{}'", name)))
    }
}

/// Turn a department name into something usable inside an index name.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.ends_with('-') {
            slug.push('-');
        }
    }
    let trimmed = slug.trim_matches('-');
    if trimmed.is_empty() { "department".to_string() } else { trimmed.to_string() }
}
