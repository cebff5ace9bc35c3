use super::decoder::PhenotypeDecoder;
use super::genome::Genome;
use super::incumbent::IncumbentTracker;
use super::translator::{DecodedSolution, PipelineTranslator};
use crate::config::AppConfig;
use crate::data::{ArtifactRegistry, FoldSet};
use crate::engines::evaluation::{fit_and_predict_timed, EvaluationError, EvaluationRequest, EvaluationService};
use crate::engines::events::SearchEvent;
use crate::engines::regression::{FeatureExtractor, RegressionSearch, RegressionSearchContext};
use crate::error::{CoevoError, Result};
use crate::types::{infeasible_objectives, timeout_objectives, Objectives, PipelineReport};
use rand::rngs::StdRng;
use rand::Rng;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Outcome of evaluating one feature-extraction genome.
#[derive(Debug, Clone)]
pub struct GenomeEvaluation {
    pub objectives: Objectives,
    /// Present iff the genome decoded, which makes it feasible
    pub decoded: Option<DecodedSolution>,
    pub fold_predictions: Vec<Vec<f64>>,
}

impl GenomeEvaluation {
    pub fn infeasible() -> Self {
        Self {
            objectives: infeasible_objectives(),
            decoded: None,
            fold_predictions: Vec::new(),
        }
    }
}

/// Decodes a genome and runs its feature extractor over every fold.
#[derive(Clone)]
pub struct FeatureEvaluator {
    decoder: Arc<PhenotypeDecoder>,
    translator: Arc<PipelineTranslator>,
    service: Arc<dyn EvaluationService>,
    folds: Arc<FoldSet>,
    artifacts: Arc<ArtifactRegistry>,
    fold_timeout: Duration,
}

impl FeatureEvaluator {
    pub fn new(
        decoder: Arc<PhenotypeDecoder>,
        translator: Arc<PipelineTranslator>,
        service: Arc<dyn EvaluationService>,
        folds: Arc<FoldSet>,
        fold_timeout: Duration,
    ) -> Self {
        Self {
            decoder,
            translator,
            service,
            folds,
            artifacts: Arc::new(ArtifactRegistry::new()),
            fold_timeout,
        }
    }

    pub fn decoder(&self) -> &Arc<PhenotypeDecoder> {
        &self.decoder
    }

    /// `Err` only for fatal errors. Every other failure becomes a sentinel.
    ///
    /// A decodable genome that completes all folds gets the timeout sentinel as a
    /// provisional value until the regression search rates it.
    pub fn evaluate_genome(&self, genome: Arc<Genome>, cancelled: &AtomicBool) -> Result<GenomeEvaluation> {
        let roots = match self.decoder.decode(&genome) {
            Ok(roots) => roots,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                log::trace!("Genome {} is infeasible: {}", genome.fingerprint(), e);
                return Ok(GenomeEvaluation::infeasible());
            }
        };

        let solution = DecodedSolution::new(genome, roots, &self.translator);
        log::trace!("Decoded genome to {}", solution.construction);
        let extractor = FeatureExtractor::from(&solution);
        let materialise = self.artifacts.claim(&extractor.hash);

        let mut objectives = timeout_objectives();
        let mut fold_predictions = Vec::with_capacity(self.folds.len());

        for (index, fold) in self.folds.folds.iter().enumerate() {
            if cancelled.load(Ordering::SeqCst) {
                log::debug!("Evaluation of {} cancelled before fold {}", solution.construction, index);
                objectives = infeasible_objectives();
                break;
            }

            let (mut train, mut test) = (fold.train.clone(), fold.test.clone());
            if materialise {
                let (train_artifact, test_artifact) = self.folds.artifact_names(&extractor.hash, index);
                train = train.cached_as(train_artifact);
                test = test.cached_as(test_artifact);
            }
            let request = EvaluationRequest {
                construction: solution.construction.clone(),
                imports: solution.imports.clone(),
                train,
                test,
                timeout: self.fold_timeout,
            };

            match fit_and_predict_timed(Arc::clone(&self.service), request) {
                Ok(predictions) => fold_predictions.push(predictions),
                Err(EvaluationError::Timeout(after)) => {
                    log::debug!("Fold {} of {} timed out after {:?}", index, solution.construction, after);
                    objectives = timeout_objectives();
                    break;
                }
                Err(e) => {
                    log::debug!("Fold {} of {} failed: {}", index, solution.construction, e);
                    objectives = infeasible_objectives();
                    break;
                }
            }
        }

        if materialise {
            if fold_predictions.len() == self.folds.len() {
                self.artifacts.commit(&extractor.hash);
            } else {
                self.artifacts.release(&extractor.hash);
            }
        }

        Ok(GenomeEvaluation {
            objectives,
            decoded: Some(solution),
            fold_predictions,
        })
    }

    /// Evaluate a whole generation on a bounded pool. Genomes still running at the
    /// deadline are marked infeasible and left to finish unobserved.
    pub fn evaluate_batch(&self, genomes: &[Arc<Genome>], workers: usize, deadline: Duration) -> Result<Vec<GenomeEvaluation>> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers.max(1))
            .thread_name(|i| format!("feature-eval-{}", i))
            .panic_handler(|_| log::error!("Feature evaluation worker panicked"))
            .build()
            .map_err(|e| CoevoError::Configuration(format!("Failed to build worker pool: {}", e)))?;

        let cancelled = Arc::new(AtomicBool::new(false));
        let (sender, receiver) = mpsc::channel();
        for (index, genome) in genomes.iter().enumerate() {
            let evaluator = self.clone();
            let genome = Arc::clone(genome);
            let cancelled = Arc::clone(&cancelled);
            let sender = sender.clone();
            pool.spawn(move || {
                let result = evaluator.evaluate_genome(genome, &cancelled);
                let _ = sender.send((index, result));
            });
        }
        drop(sender);

        let deadline_at = Instant::now() + deadline;
        let mut results: Vec<Option<GenomeEvaluation>> = (0..genomes.len()).map(|_| None).collect();
        let mut received = 0;
        let mut fatal = None;

        while received < genomes.len() {
            let remaining = deadline_at.saturating_duration_since(Instant::now());
            match receiver.recv_timeout(remaining) {
                Ok((index, Ok(evaluation))) => {
                    results[index] = Some(evaluation);
                    received += 1;
                }
                Ok((_, Err(e))) => {
                    fatal = Some(e);
                    break;
                }
                Err(RecvTimeoutError::Timeout) => {
                    log::warn!(
                        "Generation deadline of {:?} reached with {} of {} genomes unfinished",
                        deadline,
                        genomes.len() - received,
                        genomes.len()
                    );
                    break;
                }
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        cancelled.store(true, Ordering::SeqCst);
        drop(pool);

        if let Some(e) = fatal {
            return Err(e);
        }
        Ok(results
            .into_iter()
            .map(|r| r.unwrap_or_else(GenomeEvaluation::infeasible))
            .collect())
    }
}

/// Summary of one outer generation.
#[derive(Debug, Clone)]
pub struct GenerationReport {
    pub evaluated: usize,
    pub feasible: usize,
    /// Best end-to-end pipeline of the regression search, if it found one
    pub best: Option<PipelineReport>,
}

/// Evaluates generations of feature-extraction genomes and couples them to the
/// regression search.
pub struct GenerationCoordinator {
    config: AppConfig,
    evaluator: FeatureEvaluator,
    inner: RegressionSearchContext,
    incumbent: Arc<IncumbentTracker>,
}

impl GenerationCoordinator {
    pub fn new(
        config: AppConfig,
        evaluator: FeatureEvaluator,
        inner: RegressionSearchContext,
        incumbent: Arc<IncumbentTracker>,
    ) -> Self {
        Self {
            config,
            evaluator,
            inner,
            incumbent,
        }
    }

    pub fn evaluator(&self) -> &FeatureEvaluator {
        &self.evaluator
    }

    pub fn incumbent(&self) -> &Arc<IncumbentTracker> {
        &self.incumbent
    }

    /// Assign both objectives to every genome. `remaining` is what is left of the
    /// total budget and caps the regression search.
    pub fn evaluate_generation(&self, genomes: &mut [Genome], rng: &mut StdRng, remaining: Duration) -> Result<GenerationReport> {
        let started = Instant::now();
        let shared: Vec<Arc<Genome>> = genomes.iter().cloned().map(Arc::new).collect();
        let evaluations = match self.evaluator.evaluate_batch(
            &shared,
            self.config.experiment.cpus,
            self.config.generation_deadline().min(remaining),
        ) {
            Ok(evaluations) => evaluations,
            Err(e) => {
                self.inner.events.publish(SearchEvent::fatal(e.to_string()));
                return Err(e);
            }
        };

        // Genomes that decode to the same pipeline share one extractor.
        let mut extractors: Vec<FeatureExtractor> = Vec::new();
        let mut by_construction: HashMap<String, usize> = HashMap::new();
        let mut feasible: Vec<(usize, usize)> = Vec::new();

        for (index, evaluation) in evaluations.iter().enumerate() {
            genomes[index].objectives = evaluation.objectives;
            if let Some(solution) = &evaluation.decoded {
                let extractor = *by_construction.entry(solution.construction.clone()).or_insert_with(|| {
                    extractors.push(FeatureExtractor::from(solution));
                    extractors.len() - 1
                });
                feasible.push((index, extractor));
            }
        }

        let mut report = GenerationReport {
            evaluated: genomes.len(),
            feasible: feasible.len(),
            best: None,
        };
        if feasible.is_empty() {
            log::info!("No feasible feature extractor in this generation");
            return Ok(report);
        }

        let timeout = self
            .config
            .inner_search_timeout(remaining.saturating_sub(started.elapsed()));
        let seed = rng.gen::<u64>();
        log::info!(
            "Searching regressors for {} feature extractors ({} feasible genomes) for at most {:?}",
            extractors.len(),
            feasible.len(),
            timeout
        );

        let outcome = RegressionSearch::new(&self.inner, extractors).and_then(|search| search.run(seed, timeout));
        match outcome {
            Ok(outcome) => {
                for &(index, extractor) in &feasible {
                    genomes[index].objectives = outcome.ratings[extractor];
                }
                if !outcome.best.is_none_found() {
                    self.incumbent.update(&outcome.best);
                    report.best = Some(outcome.best);
                }
                Ok(report)
            }
            Err(e) if e.is_fatal() => {
                self.inner.events.publish(SearchEvent::fatal(e.to_string()));
                Err(e)
            }
            Err(e) => {
                log::warn!("Regression search aborted: {}", e);
                self.inner.events.publish(SearchEvent::fatal(e.to_string()));
                for &(index, _) in &feasible {
                    genomes[index].objectives = timeout_objectives();
                }
                Ok(report)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{Component, ComponentRepository, Parameter, ParameterDomain};
    use crate::data::{DatasetRef, Fold};
    use crate::engines::events::{ChannelSink, EventSink, NullSink};
    use crate::engines::generation::codec::GenomeCodec;
    use crate::engines::generation::decoder::DecodeMode;
    use crate::engines::generation::genome::Gene;
    use crate::engines::generation::strategy::BasicStrategy;
    use crate::engines::metrics::{FeatureRater, LossMetric};
    use crate::engines::regression::PipelineEvaluator;
    use rand::SeedableRng;
    use std::sync::Mutex;
    use std::thread;

    /// Feature extractors: ROCKET is fine, BOSS times out, WEASEL crashes.
    /// Ridge is exact, but only on training artifacts a successful extractor wrote.
    struct FakeService {
        cached: Mutex<Vec<String>>,
    }

    impl EvaluationService for FakeService {
        fn fit_and_predict(&self, request: &EvaluationRequest) -> std::result::Result<Vec<f64>, EvaluationError> {
            let result = match request.construction.as_str() {
                c if c.starts_with("BOSS") => {
                    thread::sleep(Duration::from_millis(300));
                    Ok(vec![0.0, 0.0])
                }
                c if c.starts_with("WEASEL") => Err(EvaluationError::TrainingFailed(anyhow::anyhow!("crashed"))),
                c if c.starts_with("Ridge") => {
                    if self.cached.lock().unwrap().contains(&request.train.name) {
                        Ok(vec![1.0, 3.0])
                    } else {
                        Err(EvaluationError::TrainingFailed(anyhow::anyhow!("no artifact {}", request.train.name)))
                    }
                }
                _ => Ok(vec![2.0, 2.0]),
            };
            if let (Ok(_), Some(artifact)) = (&result, &request.train.cache_as) {
                self.cached.lock().unwrap().push(artifact.clone());
            }
            result
        }
    }

    fn features() -> Arc<ComponentRepository> {
        Arc::new(
            ComponentRepository::new(vec![
                Component::new("ROCKET")
                    .provides("Feature")
                    .with_parameter(Parameter::new("n_kernels", ParameterDomain::integer(10, 20))),
                Component::new("BOSS").provides("Feature"),
                Component::new("WEASEL").provides("Feature"),
            ])
            .unwrap(),
        )
    }

    fn setup(service: Arc<FakeService>, events: Arc<dyn EventSink>) -> (GenerationCoordinator, Arc<GenomeCodec>) {
        let mut config = AppConfig::default();
        config.experiment.cpus = 3;
        config.regression.population_size = 10;
        config.regression.generations = 2;

        let main: Vec<String> = ["ROCKET", "BOSS", "WEASEL"].iter().map(|s| s.to_string()).collect();
        let codec = Arc::new(GenomeCodec::new(features(), &main, &[]));
        let decoder = Arc::new(PhenotypeDecoder::new(
            Arc::clone(&codec),
            Arc::new(BasicStrategy::default()),
            DecodeMode::MainComponents,
        ));
        let translator = Arc::new(PipelineTranslator::default());
        let folds = Arc::new(FoldSet::new(
            "FD001",
            42,
            (0..2)
                .map(|i| Fold {
                    train: DatasetRef::new(format!("train{}", i)),
                    test: DatasetRef::new(format!("test{}", i)),
                    ground_truth: vec![1.0, 3.0],
                })
                .collect(),
        ));
        let service: Arc<dyn EvaluationService> = service;

        let evaluator = FeatureEvaluator::new(
            decoder,
            Arc::clone(&translator),
            Arc::clone(&service),
            Arc::clone(&folds),
            Duration::from_millis(100),
        );
        let regressors = Arc::new(
            ComponentRepository::new(vec![Component::new("Ridge").provides("AbstractRegressor")]).unwrap(),
        );
        let inner = RegressionSearchContext {
            config: config.regression.clone(),
            rater: FeatureRater::Average,
            repository: regressors,
            translator,
            evaluator: Arc::new(PipelineEvaluator::new(
                service,
                folds,
                LossMetric::MeanAbsoluteError,
                true,
                Duration::from_secs(5),
                Arc::clone(&events),
            )),
            events: Arc::clone(&events),
        };
        let incumbent = Arc::new(IncumbentTracker::new(events));
        (GenerationCoordinator::new(config, evaluator, inner, incumbent), codec)
    }

    fn activating(codec: &GenomeCodec, name: &str) -> Genome {
        let mut genome = codec.blank_genome();
        codec.set_activation(&mut genome, name, true).unwrap();
        genome
    }

    #[test]
    fn test_fold_outcomes_map_to_sentinels() {
        let service = Arc::new(FakeService { cached: Mutex::new(Vec::new()) });
        let (coordinator, codec) = setup(Arc::clone(&service), Arc::new(NullSink));
        let evaluator = coordinator.evaluator();
        let cancelled = AtomicBool::new(false);

        let fine = evaluator.evaluate_genome(Arc::new(activating(&codec, "ROCKET")), &cancelled).unwrap();
        assert_eq!(fine.objectives, timeout_objectives());
        assert_eq!(fine.fold_predictions.len(), 2);
        assert!(fine.decoded.is_some());

        let slow = evaluator.evaluate_genome(Arc::new(activating(&codec, "BOSS")), &cancelled).unwrap();
        assert_eq!(slow.objectives, timeout_objectives());
        assert!(slow.fold_predictions.is_empty());
        assert!(slow.decoded.is_some());

        let broken = evaluator.evaluate_genome(Arc::new(activating(&codec, "WEASEL")), &cancelled).unwrap();
        assert_eq!(broken.objectives, infeasible_objectives());
        assert!(broken.decoded.is_some());

        let empty = evaluator.evaluate_genome(Arc::new(codec.blank_genome()), &cancelled).unwrap();
        assert_eq!(empty.objectives, infeasible_objectives());
        assert!(empty.decoded.is_none());
    }

    #[test]
    fn test_artifacts_written_once_per_extractor() {
        let service = Arc::new(FakeService { cached: Mutex::new(Vec::new()) });
        let (coordinator, codec) = setup(Arc::clone(&service), Arc::new(NullSink));
        let cancelled = AtomicBool::new(false);

        for _ in 0..3 {
            coordinator
                .evaluator()
                .evaluate_genome(Arc::new(activating(&codec, "ROCKET")), &cancelled)
                .unwrap();
        }
        let cached = service.cached.lock().unwrap();
        assert_eq!(cached.len(), 2);
        assert!(cached[0].ends_with("_FD001_42_0_train"));
        assert!(cached[1].ends_with("_FD001_42_1_train"));
    }

    #[test]
    fn test_cancelled_genome_is_infeasible() {
        let service = Arc::new(FakeService { cached: Mutex::new(Vec::new()) });
        let (coordinator, codec) = setup(service, Arc::new(NullSink));
        let cancelled = AtomicBool::new(true);
        let evaluation = coordinator
            .evaluator()
            .evaluate_genome(Arc::new(activating(&codec, "ROCKET")), &cancelled)
            .unwrap();
        assert_eq!(evaluation.objectives, infeasible_objectives());
    }

    #[test]
    fn test_cancelled_claim_leaves_artifacts_to_next_evaluation() {
        let service = Arc::new(FakeService { cached: Mutex::new(Vec::new()) });
        let (coordinator, codec) = setup(Arc::clone(&service), Arc::new(NullSink));
        let evaluator = coordinator.evaluator();
        let rocket = Arc::new(activating(&codec, "ROCKET"));

        evaluator.evaluate_genome(Arc::clone(&rocket), &AtomicBool::new(true)).unwrap();
        assert!(service.cached.lock().unwrap().is_empty());

        let evaluation = evaluator.evaluate_genome(Arc::clone(&rocket), &AtomicBool::new(false)).unwrap();
        assert_eq!(evaluation.fold_predictions.len(), 2);
        assert_eq!(service.cached.lock().unwrap().len(), 2);
        let hash = FeatureExtractor::from(evaluation.decoded.as_ref().unwrap()).hash;
        assert!(evaluator.artifacts.is_written(&hash));

        let mut genomes = vec![(*rocket).clone()];
        let mut rng = StdRng::seed_from_u64(3);
        let report = coordinator
            .evaluate_generation(&mut genomes, &mut rng, Duration::from_secs(60))
            .unwrap();
        assert_eq!(report.best.unwrap().performance, Some(0.0));
        assert!(genomes[0].objectives[0] < 1.0);
    }

    #[test]
    fn test_failed_claim_is_released() {
        let service = Arc::new(FakeService { cached: Mutex::new(Vec::new()) });
        let (coordinator, codec) = setup(service, Arc::new(NullSink));
        let evaluator = coordinator.evaluator();

        let evaluation = evaluator
            .evaluate_genome(Arc::new(activating(&codec, "WEASEL")), &AtomicBool::new(false))
            .unwrap();
        let hash = FeatureExtractor::from(evaluation.decoded.as_ref().unwrap()).hash;
        assert!(!evaluator.artifacts.is_written(&hash));
        assert!(evaluator.artifacts.claim(&hash));
    }

    #[test]
    fn test_batch_deadline_marks_stragglers_infeasible() {
        let service = Arc::new(FakeService { cached: Mutex::new(Vec::new()) });
        let (coordinator, codec) = setup(service, Arc::new(NullSink));
        // BOSS needs 600ms for both folds and is never cut short per fold
        let evaluator = FeatureEvaluator {
            fold_timeout: Duration::from_secs(5),
            ..coordinator.evaluator().clone()
        };
        let genomes: Vec<Arc<Genome>> = ["BOSS", "ROCKET", "BOSS"]
            .iter()
            .map(|name| Arc::new(activating(&codec, name)))
            .collect();

        let started = Instant::now();
        let evaluations = evaluator.evaluate_batch(&genomes, 3, Duration::from_millis(150)).unwrap();
        assert!(started.elapsed() < Duration::from_millis(450));

        assert_eq!(evaluations.len(), 3);
        assert_eq!(evaluations[1].objectives, timeout_objectives());
        assert!(evaluations[1].decoded.is_some());
        for straggler in [&evaluations[0], &evaluations[2]] {
            assert_eq!(straggler.objectives, infeasible_objectives());
            assert!(straggler.decoded.is_none());
        }
    }

    #[test]
    fn test_repository_mismatch_aborts_batch_and_generation() {
        let service = Arc::new(FakeService { cached: Mutex::new(Vec::new()) });
        let (sink, receiver) = ChannelSink::new(64);
        let (coordinator, codec) = setup(service, Arc::new(sink));
        let short = Genome::new(vec![Gene::Binary(true)]);

        let batch = vec![Arc::new(activating(&codec, "ROCKET")), Arc::new(short.clone())];
        let result = coordinator.evaluator().evaluate_batch(&batch, 2, Duration::from_secs(10));
        assert!(matches!(result, Err(CoevoError::RepositoryLookup(_))));

        let mut genomes = vec![short];
        let mut rng = StdRng::seed_from_u64(4);
        let result = coordinator.evaluate_generation(&mut genomes, &mut rng, Duration::from_secs(60));
        assert!(matches!(result, Err(CoevoError::RepositoryLookup(_))));
        let events: Vec<SearchEvent> = receiver.try_iter().collect();
        assert!(events.iter().any(|e| matches!(e, SearchEvent::FatalFailure { .. })));
    }

    #[test]
    fn test_generation_rates_feasible_genomes() {
        let service = Arc::new(FakeService { cached: Mutex::new(Vec::new()) });
        let (sink, receiver) = ChannelSink::new(1024);
        let (coordinator, codec) = setup(service, Arc::new(sink));

        let mut genomes = vec![
            activating(&codec, "ROCKET"),
            activating(&codec, "ROCKET"),
            activating(&codec, "WEASEL"),
            codec.blank_genome(),
        ];
        let mut rng = StdRng::seed_from_u64(1);
        let report = coordinator
            .evaluate_generation(&mut genomes, &mut rng, Duration::from_secs(60))
            .unwrap();

        assert_eq!(report.evaluated, 4);
        assert_eq!(report.feasible, 3);
        // identical phenotypes share their rating
        assert_eq!(genomes[0].objectives, genomes[1].objectives);
        assert_eq!(genomes[3].objectives, infeasible_objectives());
        assert!(genomes[0].objectives[1] <= 0.0);

        // ROCKET's artifacts exist, so Ridge on them is exact
        let best = report.best.unwrap();
        assert_eq!(best.performance, Some(0.0));
        assert!(best.construction.contains("ROCKET("));
        assert_eq!(coordinator.incumbent().snapshot().performance, Some(0.0));

        let events: Vec<SearchEvent> = receiver.try_iter().collect();
        assert!(events.iter().any(|e| matches!(e, SearchEvent::NewIncumbent { .. })));
    }
}
