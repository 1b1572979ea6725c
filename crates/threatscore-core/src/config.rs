//! Lightweight configuration loader and path helpers.
//!
//! Uses Figment to merge built-in defaults + `config.toml` + `config.<env>.toml`
//! + `APP_*` env vars (`__` separates nested keys, e.g. `APP_STORE__MAX_RESULTS`).
//! Provides helpers to expand `~` and `${VAR}` and to resolve relative paths
//! against a known base directory.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::aggregate::{Aggregation, AggregationMode};
use crate::error::{Error, Result};
use crate::types::DEFAULT_MAX_RESULTS;

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::from(Serialized::defaults(Settings::default())).merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        let config = Self { figment };
        config.settings()?;
        Ok(config)
    }

    /// Defaults overlaid with an inline TOML document; no files or env vars.
    pub fn from_toml_str(toml: &str) -> Result<Self> {
        let figment = Figment::from(Serialized::defaults(Settings::default())).merge(Toml::string(toml));
        let config = Self { figment };
        config.settings()?;
        Ok(config)
    }

    pub fn get<T>(&self, key: &str) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| Error::InvalidConfig(format!("Failed to get '{}': {}", key, e)))
    }

    pub fn settings(&self) -> Result<Settings> {
        let settings: Settings = self.figment.extract().map_err(|e| Error::InvalidConfig(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub cache: CacheSettings,
    pub store: StoreSettings,
    pub generator: GeneratorSettings,
    pub aggregation: AggregationMode,
    pub departments: Vec<DepartmentSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    pub root: String,
    pub index_prefix: String,
    pub max_results: usize,
    pub retry: RetrySettings,
}

/// `max_attempts = 1` means a single try with no retry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorSettings {
    pub seed: Option<u64>,
}

/// A department to generate: `users` samples around `mean` with spread `variance`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepartmentSpec {
    pub name: String,
    pub mean: i64,
    pub variance: i64,
    pub users: usize,
    pub weight: f64,
}

impl DepartmentSpec {
    pub fn new(name: impl Into<String>, mean: i64, variance: i64, users: usize, weight: f64) -> Self {
        Self { name: name.into(), mean, variance, users, weight }
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self { path: "dev_data/threat_scores.csv".to_string() }
    }
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            root: "dev_data/indexes".to_string(),
            index_prefix: "threat-dept".to_string(),
            max_results: DEFAULT_MAX_RESULTS,
            retry: RetrySettings::default(),
        }
    }
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self { max_attempts: 1, initial_backoff_ms: 100, max_backoff_ms: 2000 }
    }
}

impl RetrySettings {
    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }
}

impl Default for Settings {
    fn default() -> Self {
        let departments = [("engineering", 50), ("finance", 60), ("operations", 55), ("sales", 45), ("support", 65)]
            .iter()
            .enumerate()
            .map(|(i, (name, mean))| DepartmentSpec::new(*name, *mean, 10, 100, (i + 1) as f64))
            .collect();
        Self {
            cache: CacheSettings::default(),
            store: StoreSettings::default(),
            generator: GeneratorSettings::default(),
            aggregation: AggregationMode::Weighted,
            departments,
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        if self.departments.is_empty() {
            return Err(Error::InvalidConfig("at least one department is required".to_string()));
        }
        let mut seen = HashSet::new();
        for d in &self.departments {
            if d.name.trim().is_empty() {
                return Err(Error::InvalidConfig("department names must not be empty".to_string()));
            }
            if !seen.insert(d.name.as_str()) {
                return Err(Error::InvalidConfig(format!("duplicate department '{}'", d.name)));
            }
            if !d.weight.is_finite() || d.weight < 0.0 {
                return Err(Error::InvalidConfig(format!("department '{}' has invalid weight {}", d.name, d.weight)));
            }
        }
        if self.store.max_results == 0 {
            return Err(Error::InvalidConfig("store.max_results must be at least 1".to_string()));
        }
        if let Some(d) = self.departments.iter().find(|d| d.users > self.store.max_results) {
            return Err(Error::InvalidConfig(format!(
                "department '{}' has {} users but store.max_results is {}",
                d.name, d.users, self.store.max_results
            )));
        }
        if self.store.retry.max_attempts == 0 {
            return Err(Error::InvalidConfig("store.retry.max_attempts must be at least 1".to_string()));
        }
        Ok(())
    }

    pub fn weights(&self) -> Vec<f64> {
        self.departments.iter().map(|d| d.weight).collect()
    }

    pub fn aggregation(&self) -> Aggregation {
        match self.aggregation {
            AggregationMode::Weighted => Aggregation::Weighted(self.weights()),
            AggregationMode::Unweighted => Aggregation::Unweighted,
        }
    }

    /// Configured aggregation for departments read back from a cache, matching weights by name.
    pub fn aggregation_for<'a, I>(&self, departments: I) -> Result<Aggregation>
    where
        I: IntoIterator<Item = &'a str>,
    {
        match self.aggregation {
            AggregationMode::Unweighted => Ok(Aggregation::Unweighted),
            AggregationMode::Weighted => {
                let mut weights = Vec::new();
                for name in departments {
                    match self.departments.iter().find(|d| d.name == name) {
                        Some(d) => weights.push(d.weight),
                        None => {
                            return Err(Error::InvalidConfig(format!("department '{}' has no configured weight", name)))
                        }
                    }
                }
                Ok(Aggregation::Weighted(weights))
            }
        }
    }

    pub fn cache_path(&self) -> PathBuf {
        expand_path(&self.cache.path)
    }

    pub fn store_root(&self) -> PathBuf {
        expand_path(&self.store.root)
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    // Expand env vars first
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
/// If `p` is absolute, it's returned as-is; otherwise `base.join(p)` is returned.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}
