use coevorul::config::AppConfig;
use coevorul::engines::generation::strategy::SeedSpec;
use coevorul::engines::generation::{CoevolutionEngine, GenomeStrategy};
use coevorul::types::{infeasible_objectives, WORST_OBJECTIVE_INFEASIBLE};
use coevorul::{
    ChannelSink, ComponentRepository, DatasetRef, EvaluationError, EvaluationRequest, EvaluationService, EventSink,
    Fold, FoldSet, SearchEvent,
};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

const FEATURES: &str = r#"{
    "repository": "timeseries",
    "components": [
        {
            "name": "pyts.transformation.ROCKET",
            "provided_interfaces": ["TimeSeriesFeatureGenerator"],
            "parameters": [
                {"name": "n_kernels", "domain": {"type": "numeric", "min": 10, "max": {{max_kernels}}, "integer": true}}
            ]
        },
        {
            "name": "pyts.transformation.BOSS",
            "provided_interfaces": ["TimeSeriesFeatureGenerator"],
            "parameters": [
                {"name": "word_size", "domain": {"type": "categorical", "values": ["2", "4"]}},
                {"name": "sparse", "domain": {"type": "categorical", "values": ["false"]}}
            ]
        },
        {
            "name": "pyts.transformation.WEASEL",
            "provided_interfaces": ["TimeSeriesFeatureGenerator"],
            "parameters": [
                {"name": "strategy", "domain": {"type": "categorical", "values": ["uniform", "quantile"]}}
            ]
        }
    ]
}"#;

const REGRESSORS: &str = r#"{
    "components": [
        {"name": "sklearn.linear_model.Ridge", "provided_interfaces": ["AbstractRegressor"]},
        {
            "name": "sklearn.svm.SVR",
            "provided_interfaces": ["AbstractRegressor"],
            "parameters": [{"name": "C", "domain": {"type": "numeric", "min": 0.1, "max": 10.0}}]
        }
    ]
}"#;

/// Feature extractors always succeed and write their artifacts. On written artifacts
/// Ridge is exact and SVR is off by one.
#[derive(Default)]
struct FakeService {
    written: Mutex<HashSet<String>>,
}

impl EvaluationService for FakeService {
    fn fit_and_predict(&self, request: &EvaluationRequest) -> Result<Vec<f64>, EvaluationError> {
        let regressor = request.construction.starts_with("Ridge") || request.construction.starts_with("SVR");
        if !regressor {
            if let Some(artifact) = &request.train.cache_as {
                self.written.lock().unwrap().insert(artifact.clone());
            }
            return Ok(vec![0.0, 0.0]);
        }
        if !self.written.lock().unwrap().contains(&request.train.name) {
            return Err(EvaluationError::TrainingFailed(anyhow::anyhow!("missing {}", request.train.name)));
        }
        if request.construction.starts_with("Ridge") {
            Ok(vec![10.0, 30.0])
        } else {
            Ok(vec![11.0, 31.0])
        }
    }
}

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn folds() -> FoldSet {
    FoldSet::new(
        "FD001",
        42,
        (0..2)
            .map(|i| Fold {
                train: DatasetRef::new(format!("FD001_train_{}", i)),
                test: DatasetRef::new(format!("FD001_test_{}", i)),
                ground_truth: vec![10.0, 30.0],
            })
            .collect(),
    )
}

fn config() -> AppConfig {
    let mut config = AppConfig::default();
    config.experiment.cpus = 2;
    config.experiment.folds = 2;
    config.experiment.total_timeout_secs = 120;
    config.feature.main_components_as_roots = true;
    config.feature.main_components = vec![
        "pyts.transformation.BOSS".to_string(),
        "pyts.transformation.ROCKET".to_string(),
        "pyts.transformation.WEASEL".to_string(),
    ];
    config.feature.main_components_without_activation = Vec::new();
    config.feature.population_size = 4;
    config.feature.max_generations = Some(2);
    config.feature.seeds = vec![SeedSpec::activating(["pyts.transformation.ROCKET"])];
    config.regression.population_size = 8;
    config.regression.generations = 2;
    config
}

fn variables() -> HashMap<String, String> {
    [("max_kernels".to_string(), "500".to_string())].into_iter().collect()
}

#[test]
fn test_search_finds_exact_pipeline() {
    init_logger();
    let (sink, receiver) = ChannelSink::new(4096);
    let events: Arc<dyn EventSink> = Arc::new(sink);

    let features = Arc::new(ComponentRepository::from_json_str(FEATURES, &variables()).unwrap());
    let regressors = Arc::new(ComponentRepository::from_json_str(REGRESSORS, &HashMap::new()).unwrap());
    let mut engine = CoevolutionEngine::new(
        config(),
        features,
        regressors,
        folds(),
        Arc::new(FakeService::default()),
        events,
    )
    .unwrap();

    let result = engine.run().unwrap();
    assert_eq!(result.generations, 2);
    assert_eq!(result.population.len(), 4);
    for genome in &result.population {
        assert!(genome.objectives[0] <= WORST_OBJECTIVE_INFEASIBLE);
    }

    let incumbent = result.incumbent;
    assert_eq!(incumbent.performance, Some(0.0));
    assert!(incumbent.construction.starts_with("make_pipeline("));
    assert!(incumbent.construction.ends_with("Ridge())"));
    assert!(incumbent.imports.contains("from sklearn.pipeline import make_pipeline"));
    assert!(incumbent.imports.contains("from sklearn.linear_model import Ridge"));

    let events: Vec<SearchEvent> = receiver.try_iter().collect();
    assert!(events.iter().any(|e| matches!(e, SearchEvent::NewIncumbent { performance, .. } if *performance == 0.0)));
    assert!(events.iter().any(|e| matches!(e, SearchEvent::FeatureExtractorRated { .. })));
    assert!(events.iter().any(|e| matches!(e, SearchEvent::CandidateEvaluated { outcome: Ok(_), .. })));
    assert!(!events.iter().any(|e| matches!(e, SearchEvent::FatalFailure { .. })));
}

#[test]
fn test_seed_genome_sets_requested_parameters() {
    init_logger();
    let features = Arc::new(ComponentRepository::from_json_str(FEATURES, &variables()).unwrap());
    let regressors = Arc::new(ComponentRepository::from_json_str(REGRESSORS, &HashMap::new()).unwrap());
    let mut config = config();
    config.feature.seeds = vec![SeedSpec::activating(["pyts.transformation.BOSS"])
        .with_parameter("pyts.transformation.BOSS", "word_size", "4")];

    let engine = CoevolutionEngine::new(
        config,
        features,
        regressors,
        folds(),
        Arc::new(FakeService::default()),
        Arc::new(coevorul::NullSink),
    )
    .unwrap();

    let codec = engine.codec();
    // ROCKET: activation + n_kernels, BOSS: activation + word_size, WEASEL: activation + strategy
    assert_eq!(codec.gene_count(), 6);
    assert!(codec.entry("pyts.transformation.BOSS").unwrap().fixed_parameters.contains_key("sparse"));

    let strategy = coevorul::engines::generation::BasicStrategy::new(vec![SeedSpec::activating([
        "pyts.transformation.BOSS",
    ])
    .with_parameter("pyts.transformation.BOSS", "word_size", "4")]);
    let seeds = strategy.seed_genomes(codec).unwrap();
    assert_eq!(seeds.len(), 1);
    assert_eq!(seeds[0].objectives, infeasible_objectives());

    let described = codec.describe(&seeds[0]).join("\n");
    assert!(described.contains("word_size=4"));
}

#[test]
fn test_load_resolves_template_variables() {
    init_logger();
    let dir = tempfile::tempdir().unwrap();
    let features = dir.path().join("features.json");
    let regressors = dir.path().join("regressors.json");
    std::fs::write(&features, FEATURES).unwrap();
    std::fs::write(&regressors, REGRESSORS).unwrap();

    let mut config = config();
    config.feature.search_space = features.display().to_string();
    config.regression.search_space = regressors.display().to_string();

    let engine = CoevolutionEngine::load(
        config,
        &variables(),
        folds(),
        Arc::new(FakeService::default()),
        Arc::new(coevorul::NullSink),
    )
    .unwrap();
    assert_eq!(engine.codec().repository().len(), 3);
    assert_eq!(engine.incumbent().performance, Some(f64::MAX));

    // an unresolved template is a parse error
    let mut broken = self::config();
    broken.feature.search_space = features.display().to_string();
    broken.regression.search_space = regressors.display().to_string();
    let result = CoevolutionEngine::load(
        broken,
        &HashMap::new(),
        folds(),
        Arc::new(FakeService::default()),
        Arc::new(coevorul::NullSink),
    );
    assert!(result.is_err());
}
