//! threatscore-pipeline
//!
//! End-to-end threat score analytics over any `DocumentStore`:
//! obtain samples (cache or generator), push them to the store, read them
//! back, score each department, aggregate, and tear the indices down.

pub mod retry;

use indicatif::ProgressBar;
use serde::Serialize;
use std::collections::HashSet;
use std::path::PathBuf;
use tracing::{debug, info, warn};

use threatscore_core::aggregate::{department_score, Aggregation, AggregationMode};
use threatscore_core::config::{DepartmentSpec, Settings};
use threatscore_core::error::{Error, Result};
use threatscore_core::generator::SampleGenerator;
use threatscore_core::traits::DocumentStore;
use threatscore_core::types::{
    slugify, AggregatedScore, DepartmentDataset, DepartmentScore, IndexHandle, IndexSchema, DEFAULT_MAX_RESULTS,
};

pub use retry::RetryPolicy;

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub cache_path: PathBuf,
    pub index_prefix: String,
    pub max_results: usize,
    pub retry: RetryPolicy,
    pub seed: Option<u64>,
    /// Ignore any existing cache and generate fresh samples.
    pub regenerate: bool,
}

impl PipelineOptions {
    pub fn new(cache_path: impl Into<PathBuf>) -> Self {
        Self {
            cache_path: cache_path.into(),
            index_prefix: "threat-dept".to_string(),
            max_results: DEFAULT_MAX_RESULTS,
            retry: RetryPolicy::none(),
            seed: None,
            regenerate: false,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            cache_path: settings.cache_path(),
            index_prefix: settings.store.index_prefix.clone(),
            max_results: settings.store.max_results,
            retry: RetryPolicy::from_settings(&settings.store.retry),
            seed: settings.generator.seed,
            regenerate: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DatasetOrigin {
    Generated,
    Cache,
}

#[derive(Debug, Clone, Serialize)]
pub struct DepartmentReport {
    pub department: String,
    pub index_name: String,
    pub samples: usize,
    pub score: DepartmentScore,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalyticsReport {
    pub origin: DatasetOrigin,
    pub mode: AggregationMode,
    pub departments: Vec<DepartmentReport>,
    pub aggregated: AggregatedScore,
}

pub struct ThreatAnalytics<S> where S: DocumentStore {
    store: S,
    options: PipelineOptions,
    generator: SampleGenerator,
    schema: IndexSchema,
    created: Vec<String>,
    progress: ProgressBar,
}

impl<S> ThreatAnalytics<S> where S: DocumentStore {
    pub fn new(store: S, options: PipelineOptions) -> Self {
        let generator = match options.seed {
            Some(seed) => SampleGenerator::seeded(seed),
            None => SampleGenerator::from_entropy(),
        };
        Self { store, options, generator, schema: IndexSchema::score(), created: Vec::new(), progress: ProgressBar::hidden() }
    }

    pub fn with_generator(mut self, generator: SampleGenerator) -> Self {
        self.generator = generator;
        self
    }

    /// Ticks once per department published and once per department scored.
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Indices created in this session and not yet torn down.
    pub fn active_indices(&self) -> &[String] {
        &self.created
    }

    pub fn index_name(&self, department: &str) -> String {
        format!("{}-{}", self.options.index_prefix, slugify(department))
    }

    pub fn generate(&mut self, specs: &[DepartmentSpec]) -> Result<Vec<DepartmentDataset>> {
        specs
            .iter()
            .map(|spec| self.generator.generate_dataset(spec.name.clone(), spec.mean, spec.variance, spec.users))
            .collect()
    }

    /// Reload the cached datasets when they match `specs`, otherwise generate and cache fresh ones.
    pub fn obtain_datasets(&mut self, specs: &[DepartmentSpec]) -> Result<(Vec<DepartmentDataset>, DatasetOrigin)> {
        let path = self.options.cache_path.clone();
        if !self.options.regenerate {
            match threatscore_cache::load(&path) {
                Ok(datasets) if same_departments(&datasets, specs) => {
                    info!(path = %path.display(), departments = datasets.len(), "reusing cached samples");
                    return Ok((datasets, DatasetOrigin::Cache));
                }
                Ok(_) => warn!(path = %path.display(), "cached departments differ from configuration, regenerating"),
                Err(Error::NotFound(_)) => info!(path = %path.display(), "no sample cache, generating"),
                Err(e) => return Err(e),
            }
        }
        let datasets = self.generate(specs)?;
        threatscore_cache::save(&datasets, &path)?;
        Ok((datasets, DatasetOrigin::Generated))
    }

    /// Ensure an index per department and bulk index its samples.
    pub fn publish(&mut self, datasets: &[DepartmentDataset]) -> Result<Vec<IndexHandle>> {
        let mut names = HashSet::new();
        let mut handles = Vec::with_capacity(datasets.len());
        for dataset in datasets {
            let index_name = self.index_name(&dataset.department);
            if !names.insert(index_name.clone()) {
                return Err(Error::InvalidConfig(format!(
                    "department '{}' maps to index '{}' already used in this batch",
                    dataset.department, index_name
                )));
            }
            handles.push(self.publish_department(&index_name, dataset)?);
        }
        Ok(handles)
    }

    /// Publish one dataset under a caller-chosen index name. The index is torn down with the session.
    pub fn publish_department(&mut self, index_name: &str, dataset: &DepartmentDataset) -> Result<IndexHandle> {
        let store = &self.store;
        let schema = &self.schema;
        self.options.retry.run("ensure_index", || store.ensure_index(index_name, schema))?;
        if !self.created.iter().any(|n| n == index_name) {
            self.created.push(index_name.to_string());
        }
        let values = dataset.values();
        let handle = self.options.retry.run("bulk_index", || store.bulk_index(index_name, &values))?;
        debug!(department = %dataset.department, index = index_name, documents = handle.documents, "published department");
        self.progress.inc(1);
        Ok(handle)
    }

    /// Read a department back from the store. Scoring a partial read is refused.
    pub fn retrieve(&self, handle: &IndexHandle, department: &str) -> Result<DepartmentDataset> {
        if handle.documents > self.options.max_results as u64 {
            return Err(Error::InvalidConfig(format!(
                "index '{}' holds {} documents but max_results is {}",
                handle.index_name, handle.documents, self.options.max_results
            )));
        }
        // One extra slot so leftover documents from an earlier run show up as a count mismatch.
        let limit = self.options.max_results.saturating_add(1);
        let values = self.options.retry.run("query_all", || self.store.query_all(&handle.index_name, limit))?;
        if values.len() as u64 != handle.documents {
            return Err(Error::InconsistentIndex(format!(
                "index '{}' returned {} documents, {} were indexed",
                handle.index_name,
                values.len(),
                handle.documents
            )));
        }
        DepartmentDataset::from_raw(department, values)
    }

    pub fn score_department(&self, handle: &IndexHandle, department: &str) -> Result<DepartmentScore> {
        let dataset = self.retrieve(handle, department)?;
        department_score(&dataset)
    }

    /// Everything except teardown; indices stay up so callers can inspect them.
    pub fn analyze(&mut self, specs: &[DepartmentSpec], aggregation: &Aggregation) -> Result<AnalyticsReport> {
        let (datasets, origin) = self.obtain_datasets(specs)?;
        info!(departments = datasets.len(), ?origin, "obtained datasets");
        let handles = self.publish(&datasets)?;

        let mut departments = Vec::with_capacity(handles.len());
        for (dataset, handle) in datasets.iter().zip(&handles) {
            let score = self.score_department(handle, &dataset.department)?;
            self.progress.inc(1);
            departments.push(DepartmentReport {
                department: dataset.department.clone(),
                index_name: handle.index_name.clone(),
                samples: dataset.len(),
                score,
            });
        }

        let scores: Vec<DepartmentScore> = departments.iter().map(|d| d.score).collect();
        let aggregated = aggregation.aggregate(&scores)?;
        info!(mode = ?aggregation.mode(), aggregated = aggregated.value(), "aggregated organization score");
        Ok(AnalyticsReport { origin, mode: aggregation.mode(), departments, aggregated })
    }

    /// Full session: analyze, then delete every index created. Teardown runs even if analysis fails.
    pub fn run(&mut self, specs: &[DepartmentSpec], aggregation: &Aggregation) -> Result<AnalyticsReport> {
        let outcome = self.analyze(specs, aggregation);
        let cleanup = self.teardown();
        match (outcome, cleanup) {
            (Ok(report), Ok(())) => Ok(report),
            (Ok(_), Err(e)) => Err(e),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(cleanup_err)) => {
                warn!(error = %cleanup_err, "teardown failed after pipeline error");
                Err(e)
            }
        }
    }

    /// Delete every index created in this session. Keeps going past failures and returns the first one.
    pub fn teardown(&mut self) -> Result<()> {
        let mut first_err = None;
        let mut remaining = Vec::new();
        for index in std::mem::take(&mut self.created) {
            match self.options.retry.run("delete_index", || self.store.delete_index(&index)) {
                Ok(()) => debug!(index = %index, "deleted session index"),
                Err(e) => {
                    warn!(index = %index, error = %e, "failed to delete session index");
                    remaining.push(index);
                    if first_err.is_none() {
                        first_err = Some(e);
                    }
                }
            }
        }
        self.created = remaining;
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl<S> Drop for ThreatAnalytics<S> where S: DocumentStore {
    fn drop(&mut self) {
        if self.created.is_empty() {
            return;
        }
        for index in &self.created {
            if let Err(e) = self.store.delete_index(index) {
                warn!(index = %index, error = %e, "best-effort index cleanup failed");
            }
        }
    }
}

fn same_departments(datasets: &[DepartmentDataset], specs: &[DepartmentSpec]) -> bool {
    datasets.len() == specs.len() && datasets.iter().zip(specs).all(|(d, s)| d.department == s.name)
}
