use rand::rngs::StdRng;
use rand::SeedableRng;
use threatscore_core::aggregate::{department_score, unweighted_mean, weighted_mean, Aggregation};
use threatscore_core::config::{resolve_with_base, Config};
use threatscore_core::generator::{sampling_range, SampleGenerator};
use threatscore_core::types::{
    slugify, validate_index_name, AggregatedScore, DepartmentDataset, DepartmentScore, RiskSample, MAX_SCORE,
};
use threatscore_core::{AggregationMode, Error};

fn scores(values: &[f64]) -> Vec<DepartmentScore> {
    values.iter().copied().map(DepartmentScore::new).collect()
}

#[test]
fn generated_samples_stay_inside_sampling_bounds() {
    let mut generator = SampleGenerator::seeded(7);
    for (mean, variance) in [(50, 10), (5, 20), (85, 10), (0, 0), (89, 0), (40, 100)] {
        let samples = generator.generate(mean, variance, 500).expect("generate");
        assert_eq!(samples.len(), 500);
        let lower = (mean - variance).max(0);
        let upper_inclusive = (mean + variance).min(i64::from(MAX_SCORE) - 1);
        for s in &samples {
            let v = i64::from(*s);
            assert!(v >= lower && v <= upper_inclusive, "mean={} variance={} sample={}", mean, variance, v);
        }
    }
}

#[test]
fn caller_supplied_rng_drives_the_generator() {
    let mut from_rng = SampleGenerator::with_rng(StdRng::seed_from_u64(3));
    let mut seeded = SampleGenerator::seeded(3);
    let a = from_rng.generate(50, 10, 64).expect("with_rng");
    let b = seeded.generate(50, 10, 64).expect("seeded");
    assert_eq!(a, b);
}

#[test]
fn seeded_generators_are_reproducible() {
    let a = SampleGenerator::seeded(42).generate(50, 10, 100).expect("a");
    let b = SampleGenerator::seeded(42).generate(50, 10, 100).expect("b");
    assert_eq!(a, b);
}

#[test]
fn degenerate_interval_is_rejected() {
    let mut generator = SampleGenerator::seeded(1);
    assert!(matches!(generator.generate(95, 0, 10), Err(Error::InvalidRange(_))));
    assert!(matches!(generator.generate(50, -10, 10), Err(Error::InvalidRange(_))));
    assert!(matches!(generator.generate(50, 10, 0), Err(Error::InvalidRange(_))));
    assert_eq!(sampling_range(50, 10).expect("range"), 40..61);
    assert_eq!(sampling_range(85, 10).expect("range"), 75..90);
    assert_eq!(sampling_range(3, 10).expect("range"), 0..14);
}

#[test]
fn risk_sample_rejects_values_outside_domain() {
    assert!(RiskSample::new(0).is_ok());
    assert!(RiskSample::new(90).is_ok());
    assert!(matches!(RiskSample::new(91), Err(Error::OutOfDomain(91))));
    assert!(matches!(RiskSample::new(-1), Err(Error::OutOfDomain(-1))));
}

#[test]
fn department_score_is_mean_within_domain() {
    let data = SampleGenerator::seeded(3).generate_dataset("eng", 50, 10, 100).expect("dataset");
    let score = department_score(&data).expect("score").value();
    assert!((0.0..=90.0).contains(&score));
    assert!((40.0..=60.0).contains(&score));

    let fixed = DepartmentDataset::from_raw("fixed", [10, 20, 30, 40]).expect("dataset");
    assert_eq!(department_score(&fixed).expect("score").value(), 25.0);
}

#[test]
fn empty_department_cannot_be_scored() {
    let empty = DepartmentDataset::new("ghost", vec![]);
    assert!(matches!(department_score(&empty), Err(Error::EmptyDataset(_))));
}

#[test]
fn reference_weighted_scenario_is_56() {
    let agg = weighted_mean(&scores(&[50.0, 60.0, 55.0, 45.0, 65.0]), &[1.0, 2.0, 3.0, 4.0, 5.0]).expect("agg");
    assert!((agg.value() - 56.0).abs() < 1e-9);
}

#[test]
fn heavier_department_pulls_the_score() {
    let agg = weighted_mean(&scores(&[30.0, 70.0]), &[1.0, 5.0]).expect("agg");
    assert!(agg.value() > 50.0);
    assert!((agg.value() - 380.0 / 6.0).abs() < 1e-9);
}

#[test]
fn equal_weights_match_unweighted_mean() {
    let s = scores(&[12.5, 40.0, 77.0, 61.25]);
    let weighted = weighted_mean(&s, &[3.0; 4]).expect("weighted");
    let plain = unweighted_mean(&s).expect("plain");
    assert!((weighted.value() - plain.value()).abs() < 1e-9);
}

#[test]
fn raising_one_weight_moves_towards_that_department() {
    let s = scores(&[20.0, 50.0, 80.0]);
    let target = 80.0;
    let mut previous = weighted_mean(&s, &[1.0, 1.0, 1.0]).expect("agg").value();
    for w in [2.0, 4.0, 8.0, 16.0, 64.0] {
        let next = weighted_mean(&s, &[1.0, 1.0, w]).expect("agg").value();
        assert!((target - next).abs() <= (target - previous).abs(), "w={} prev={} next={}", w, previous, next);
        previous = next;
    }
}

#[test]
fn all_zero_and_all_max_are_fixed_points() {
    let zeros = weighted_mean(&scores(&[0.0; 5]), &[3.0, 2.0, 1.0, 4.0, 5.0]).expect("zeros");
    assert_eq!(zeros.value(), 0.0);
    let max = weighted_mean(&scores(&[90.0; 5]), &[1.0, 2.0, 3.0, 4.0, 5.0]).expect("max");
    assert_eq!(max.value(), 90.0);
}

#[test]
fn invalid_weights_are_rejected() {
    let s = scores(&[10.0, 20.0]);
    assert!(matches!(weighted_mean(&s, &[1.0]), Err(Error::InvalidWeights(_))));
    assert!(matches!(weighted_mean(&s, &[0.0, 0.0]), Err(Error::InvalidWeights(_))));
    assert!(matches!(weighted_mean(&s, &[-1.0, 3.0]), Err(Error::InvalidWeights(_))));
    assert!(matches!(weighted_mean(&s, &[f64::NAN, 1.0]), Err(Error::InvalidWeights(_))));
    assert!(matches!(unweighted_mean(&[]), Err(Error::EmptyDataset(_))));
}

#[test]
fn scores_are_clamped_into_domain() {
    assert_eq!(DepartmentScore::new(120.0).value(), 90.0);
    assert_eq!(DepartmentScore::new(-3.0).value(), 0.0);
    assert_eq!(DepartmentScore::new(f64::NAN).value(), 0.0);
    assert_eq!(AggregatedScore::new(f64::NAN).value(), 0.0);
}

#[test]
fn huge_weights_do_not_overflow_the_mean() {
    let agg = weighted_mean(&[DepartmentScore::new(50.0); 2], &[1e308, 1e308]).expect("huge weights");
    assert!((agg.value() - 50.0).abs() < 1e-9, "got {}", agg.value());

    let skewed = weighted_mean(&scores(&[30.0, 70.0]), &[f64::MAX, f64::MAX / 4.0]).expect("skewed");
    assert!((skewed.value() - 38.0).abs() < 1e-9, "got {}", skewed.value());
    assert!((0.0..=90.0).contains(&skewed.value()));
}

#[test]
fn aggregation_variants_share_one_entry_point() {
    let s = scores(&[50.0, 60.0, 55.0, 45.0, 65.0]);
    let weighted = Aggregation::Weighted(vec![1.0, 2.0, 3.0, 4.0, 5.0]);
    assert_eq!(weighted.mode(), AggregationMode::Weighted);
    assert!((weighted.aggregate(&s).expect("weighted").value() - 56.0).abs() < 1e-9);
    assert_eq!(Aggregation::Unweighted.aggregate(&s).expect("unweighted").value(), 55.0);
}

#[test]
fn index_names_and_slugs() {
    assert!(validate_index_name("threat-dept-eng_1").is_ok());
    assert!(validate_index_name("").is_err());
    assert!(validate_index_name("Upper").is_err());
    assert!(validate_index_name("../escape").is_err());
    assert!(validate_index_name("-lead").is_err());
    assert_eq!(slugify("Research & Development"), "research-development");
    assert_eq!(slugify("!!!"), "department");
}

#[test]
fn config_defaults_describe_reference_scenario() {
    let config = Config::from_toml_str("").expect("config");
    let settings = config.settings().expect("settings");
    assert_eq!(settings.departments.len(), 5);
    assert_eq!(settings.weights(), vec![1.0, 2.0, 3.0, 4.0, 5.0]);
    assert_eq!(settings.store.max_results, 10_000);
    assert_eq!(settings.store.retry.max_attempts, 1);
    assert_eq!(settings.aggregation, AggregationMode::Weighted);
}

#[test]
fn config_overrides_merge_over_defaults() {
    let toml = r#"
aggregation = "unweighted"

[store]
index_prefix = "qa"

[generator]
seed = 99

[[departments]]
name = "legal"
mean = 30
variance = 5
users = 10
weight = 2
"#;
    let config = Config::from_toml_str(toml).expect("config");
    let settings = config.settings().expect("settings");
    assert_eq!(settings.aggregation, AggregationMode::Unweighted);
    assert_eq!(settings.store.index_prefix, "qa");
    assert_eq!(settings.store.max_results, 10_000);
    assert_eq!(settings.generator.seed, Some(99));
    assert_eq!(settings.departments.len(), 1);
    assert_eq!(settings.departments[0].weight, 2.0);
    let prefix: String = config.get("store.index_prefix").expect("get");
    assert_eq!(prefix, "qa");
}

#[test]
fn config_validation_rejects_bad_departments() {
    let dup = r#"
[[departments]]
name = "a"
mean = 1
variance = 1
users = 1
weight = 1

[[departments]]
name = "a"
mean = 1
variance = 1
users = 1
weight = 1
"#;
    assert!(matches!(Config::from_toml_str(dup), Err(Error::InvalidConfig(_))));
    let negative = "[[departments]]\nname = \"a\"\nmean = 1\nvariance = 1\nusers = 1\nweight = -2\n";
    assert!(matches!(Config::from_toml_str(negative), Err(Error::InvalidConfig(_))));
}

#[test]
fn departments_must_fit_in_one_store_read() {
    let too_big = "[store]\nmax_results = 5\n\n[[departments]]\nname = \"a\"\nmean = 50\nvariance = 10\nusers = 100\nweight = 1\n";
    assert!(matches!(Config::from_toml_str(too_big), Err(Error::InvalidConfig(_))));

    let fits = "[store]\nmax_results = 100\n\n[[departments]]\nname = \"a\"\nmean = 50\nvariance = 10\nusers = 100\nweight = 1\n";
    assert!(Config::from_toml_str(fits).is_ok());
}

#[test]
fn cached_departments_follow_configured_mode() {
    let base = "[[departments]]\nname = \"a\"\nmean = 50\nvariance = 10\nusers = 10\nweight = 1\n\n[[departments]]\nname = \"b\"\nmean = 50\nvariance = 10\nusers = 10\nweight = 3\n";
    let s = scores(&[40.0, 60.0]);

    let plain = Config::from_toml_str(&format!("aggregation = \"unweighted\"\n{}", base))
        .expect("config")
        .settings()
        .expect("settings");
    let agg = plain.aggregation_for(["b", "a"]).expect("unweighted");
    assert_eq!(agg.mode(), AggregationMode::Unweighted);
    assert_eq!(agg.aggregate(&s).expect("mean").value(), 50.0);

    let weighted = Config::from_toml_str(base).expect("config").settings().expect("settings");
    let agg = weighted.aggregation_for(["b", "a"]).expect("weighted");
    assert_eq!(agg, Aggregation::Weighted(vec![3.0, 1.0]));
    assert!(matches!(weighted.aggregation_for(["a", "zz"]), Err(Error::InvalidConfig(_))));
}

#[test]
fn huge_configured_weights_still_aggregate_in_domain() {
    let toml = r#"
[[departments]]
name = "a"
mean = 50
variance = 10
users = 10
weight = 1e308

[[departments]]
name = "b"
mean = 50
variance = 10
users = 10
weight = 1e308
"#;
    let settings = Config::from_toml_str(toml).expect("config").settings().expect("settings");
    let agg = settings.aggregation().aggregate(&scores(&[40.0, 60.0])).expect("aggregate");
    assert!((agg.value() - 50.0).abs() < 1e-9);
}

#[test]
fn relative_paths_resolve_against_base() {
    let tmp = tempfile::TempDir::new().expect("tmp");
    let resolved = resolve_with_base(tmp.path(), "cache/scores.csv");
    assert_eq!(resolved, tmp.path().join("cache/scores.csv"));
    assert_eq!(resolve_with_base(tmp.path(), "/abs/file.csv"), std::path::PathBuf::from("/abs/file.csv"));
}
