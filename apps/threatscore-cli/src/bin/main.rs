//! threatscore CLI
//!
//! Reads `config.toml` (+ `config.<RUST_ENV>.toml` + `APP_*` env vars) and
//! drives the analytics pipeline against the on-disk tantivy store.

use anyhow::Context;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use threatscore_core::aggregate::{department_score, Aggregation};
use threatscore_core::config::{Config, Settings};
use threatscore_core::generator::SampleGenerator;
use threatscore_pipeline::{AnalyticsReport, PipelineOptions, ThreatAnalytics};
use threatscore_store::TantivyStore;

#[derive(Parser)]
#[command(name = "threatscore", version, about = "Organization-wide weighted threat score analytics")]
struct Cli {
    /// Sample cache file (overrides cache.path)
    #[arg(long, global = true)]
    cache: Option<PathBuf>,

    /// Index root directory (overrides store.root)
    #[arg(long, global = true)]
    store_root: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Obtain samples, round-trip them through the store and aggregate
    Run {
        /// Plain mean across departments instead of importance weights
        #[arg(long)]
        unweighted: bool,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,

        /// Ignore the cache and generate fresh samples
        #[arg(long)]
        fresh: bool,
    },
    /// Generate samples and write the cache only
    Generate,
    /// Aggregate straight from the cache without touching the store
    Score {
        #[arg(long)]
        unweighted: bool,

        #[arg(long)]
        json: bool,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::load().map_err(|e| { eprintln!("Error loading config: {}", e); e })?;
    let settings = config.settings()?;
    let cache_path = cli.cache.clone().unwrap_or_else(|| settings.cache_path());

    match cli.command {
        Commands::Run { unweighted, json, fresh } => {
            let store_root = cli.store_root.clone().unwrap_or_else(|| settings.store_root());
            let store = TantivyStore::open(&store_root)?;
            let mut options = PipelineOptions::from_settings(&settings);
            options.cache_path = cache_path;
            options.regenerate = fresh;

            let pb = ProgressBar::new((settings.departments.len() * 2) as u64);
            pb.set_style(ProgressStyle::default_bar().template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} departments {msg}")?.progress_chars("#>-"));
            let mut analytics = ThreatAnalytics::new(store, options).with_progress(pb.clone());
            let report = analytics.run(&settings.departments, &aggregation(&settings, unweighted));
            pb.finish_and_clear();
            print_report(&report?, json)?;
        }
        Commands::Generate => {
            let mut generator = match settings.generator.seed {
                Some(seed) => SampleGenerator::seeded(seed),
                None => SampleGenerator::from_entropy(),
            };
            let datasets = settings
                .departments
                .iter()
                .map(|d| generator.generate_dataset(d.name.clone(), d.mean, d.variance, d.users))
                .collect::<Result<Vec<_>, _>>()?;
            threatscore_cache::save(&datasets, &cache_path)?;
            info!(path = %cache_path.display(), departments = datasets.len(), "cache written");
        }
        Commands::Score { unweighted, json } => {
            let datasets = threatscore_cache::load(&cache_path)
                .with_context(|| format!("no usable cache at {}; run `threatscore generate` first", cache_path.display()))?;
            let scores = datasets.iter().map(department_score).collect::<Result<Vec<_>, _>>()?;
            let aggregation = if unweighted {
                Aggregation::Unweighted
            } else {
                settings.aggregation_for(datasets.iter().map(|d| d.department.as_str()))?
            };
            let aggregated = aggregation.aggregate(&scores)?;
            if json {
                let body = serde_json::json!({
                    "mode": aggregation.mode(),
                    "departments": datasets.iter().zip(&scores).map(|(d, s)| serde_json::json!({ "department": d.department, "samples": d.len(), "score": s })).collect::<Vec<_>>(),
                    "aggregated": aggregated,
                });
                println!("{}", serde_json::to_string_pretty(&body)?);
            } else {
                for (d, s) in datasets.iter().zip(&scores) {
                    println!("{:<24} {:>6} users  {:>6.2}", d.department, d.len(), s.value());
                }
                println!("aggregated ({:?}): {}", aggregation.mode(), aggregated);
            }
        }
    }
    Ok(())
}

fn aggregation(settings: &Settings, unweighted: bool) -> Aggregation {
    if unweighted { Aggregation::Unweighted } else { settings.aggregation() }
}

fn print_report(report: &AnalyticsReport, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }
    println!("samples from {:?}", report.origin);
    for d in &report.departments {
        println!("{:<24} {:>6} users  {:>6.2}  [{}]", d.department, d.samples, d.score.value(), d.index_name);
    }
    println!("aggregated ({:?}): {}", report.mode, report.aggregated);
    Ok(())
}
