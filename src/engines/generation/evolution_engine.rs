use crate::components::ComponentRepository;
use crate::config::AppConfig;
use crate::data::FoldSet;
use crate::engines::evaluation::EvaluationService;
use crate::engines::events::EventSink;
use crate::engines::generation::{
    codec::GenomeCodec,
    coordinator::{FeatureEvaluator, GenerationCoordinator},
    decoder::{DecodeMode, PhenotypeDecoder},
    genome::Genome,
    incumbent::IncumbentTracker,
    pareto::{environmental_selection, MultiObjectiveIndividual, MINIMIZE_BOTH},
    strategy::{BasicStrategy, GenomeStrategy, WrapperActivationStrategy},
    translator::PipelineTranslator,
    variation::{mutate, pareto_tournament_selection, uniform_crossover},
};
use crate::engines::regression::{PipelineEvaluator, RegressionSearchContext};
use crate::error::Result;
use crate::types::PipelineReport;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

/// Final state of a co-evolution run.
#[derive(Debug, Clone)]
pub struct CoevolutionResult {
    /// Last surviving population, best Pareto front first
    pub population: Vec<Genome>,
    pub incumbent: Arc<PipelineReport>,
    pub generations: usize,
}

/// NSGA-II over feature-extraction genomes, with a regression search per generation.
pub struct CoevolutionEngine {
    config: AppConfig,
    codec: Arc<GenomeCodec>,
    strategy: Arc<dyn GenomeStrategy>,
    coordinator: GenerationCoordinator,
    rng: StdRng,
}

impl CoevolutionEngine {
    pub fn new(
        config: AppConfig,
        feature_repository: Arc<ComponentRepository>,
        regression_repository: Arc<ComponentRepository>,
        folds: FoldSet,
        service: Arc<dyn EvaluationService>,
        events: Arc<dyn EventSink>,
    ) -> Result<Self> {
        config.validate()?;

        let feature = &config.feature;
        let strategy: Arc<dyn GenomeStrategy> = match &feature.wrapper_activation {
            Some(wrapper) => Arc::new(WrapperActivationStrategy::new(
                wrapper.wrapper_marker.as_str(),
                wrapper.child_interface.as_str(),
                feature.seeds.clone(),
            )),
            None => Arc::new(BasicStrategy::new(feature.seeds.clone())),
        };
        let mode = if feature.main_components_as_roots {
            DecodeMode::MainComponents
        } else {
            DecodeMode::RootInterface(feature.root_interface.clone())
        };

        let codec = Arc::new(GenomeCodec::new(
            feature_repository,
            &feature.main_components,
            &feature.main_components_without_activation,
        ));
        let decoder = Arc::new(PhenotypeDecoder::new(Arc::clone(&codec), Arc::clone(&strategy), mode));
        let translator = Arc::new(PipelineTranslator::new(
            &config.pipeline.union_combinator,
            &config.pipeline.pipeline_combinator,
        ));
        let folds = Arc::new(folds);

        let evaluator = FeatureEvaluator::new(
            decoder,
            Arc::clone(&translator),
            Arc::clone(&service),
            Arc::clone(&folds),
            config.feature_fold_timeout(),
        );
        let inner = RegressionSearchContext {
            config: config.regression.clone(),
            rater: feature.feature_rater,
            repository: regression_repository,
            translator,
            evaluator: Arc::new(PipelineEvaluator::new(
                service,
                folds,
                config.experiment.loss_metric,
                config.experiment.clamp_predictions,
                config.regression.candidate_timeout() / config.experiment.folds.max(1) as u32,
                Arc::clone(&events),
            )),
            events: Arc::clone(&events),
        };
        let incumbent = Arc::new(IncumbentTracker::new(events));
        let rng = StdRng::seed_from_u64(config.experiment.seed);

        Ok(Self {
            coordinator: GenerationCoordinator::new(config.clone(), evaluator, inner, incumbent),
            config,
            codec,
            strategy,
            rng,
        })
    }

    /// Load both search spaces from the paths in `config`, substituting `template_variables`.
    pub fn load(
        config: AppConfig,
        template_variables: &HashMap<String, String>,
        folds: FoldSet,
        service: Arc<dyn EvaluationService>,
        events: Arc<dyn EventSink>,
    ) -> Result<Self> {
        let features = ComponentRepository::load(&config.feature.search_space, template_variables)?;
        let regressors = ComponentRepository::load(&config.regression.search_space, template_variables)?;
        Self::new(config, Arc::new(features), Arc::new(regressors), folds, service, events)
    }

    pub fn codec(&self) -> &Arc<GenomeCodec> {
        &self.codec
    }

    pub fn incumbent(&self) -> Arc<PipelineReport> {
        self.coordinator.incumbent().snapshot()
    }

    /// Run until the total budget is spent or the generation cap is reached.
    pub fn run(&mut self) -> Result<CoevolutionResult> {
        let started = Instant::now();
        let budget = self.config.experiment.total_timeout();
        let population_size = self.config.feature.population_size;

        let mut population = self.initialize_population()?;
        log::info!(
            "Starting co-evolution: {} genes, population {}, budget {:?}",
            self.codec.gene_count(),
            population_size,
            budget
        );

        let remaining = budget.saturating_sub(started.elapsed());
        self.coordinator.evaluate_generation(&mut population, &mut self.rng, remaining)?;
        let mut ranked = environmental_selection(Self::individuals(population), population_size, &MINIMIZE_BOTH);
        let mut generations = 1;

        loop {
            if self.config.feature.max_generations.map_or(false, |cap| generations >= cap) {
                log::info!("Generation cap of {} reached", generations);
                break;
            }
            let remaining = budget.saturating_sub(started.elapsed());
            if remaining.is_zero() {
                log::info!("Time budget exhausted after {} generations", generations);
                break;
            }

            let mut offspring = self.create_offspring(&ranked);
            self.coordinator.evaluate_generation(&mut offspring, &mut self.rng, remaining)?;

            let mut combined = ranked;
            combined.extend(Self::individuals(offspring));
            ranked = environmental_selection(combined, population_size, &MINIMIZE_BOTH);
            generations += 1;

            let front: Vec<[f64; 2]> = ranked
                .iter()
                .filter(|i| i.rank == 0)
                .map(|i| i.data.objectives)
                .collect();
            log::info!(
                "Generation {} done, first front {:?}, incumbent {:?}",
                generations,
                front,
                self.incumbent().performance
            );
        }

        ranked.sort_by(|a, b| {
            a.rank
                .cmp(&b.rank)
                .then(b.crowding_distance.total_cmp(&a.crowding_distance))
        });
        Ok(CoevolutionResult {
            population: ranked.into_iter().map(|i| i.data).collect(),
            incumbent: self.incumbent(),
            generations,
        })
    }

    /// Strategy seeds first, random genomes after.
    fn initialize_population(&mut self) -> Result<Vec<Genome>> {
        let size = self.config.feature.population_size;
        let mut population = self.strategy.seed_genomes(&self.codec)?;
        if population.len() > size {
            log::warn!("{} seed genomes exceed the population size {}", population.len(), size);
            population.truncate(size);
        }
        while population.len() < size {
            population.push(self.codec.random_genome(&mut self.rng));
        }
        Ok(population)
    }

    fn individuals(genomes: Vec<Genome>) -> Vec<MultiObjectiveIndividual<Genome>> {
        genomes
            .into_iter()
            .map(|genome| {
                let objectives = genome.objectives.to_vec();
                MultiObjectiveIndividual::new(genome, objectives)
            })
            .collect()
    }

    fn create_offspring(&mut self, ranked: &[MultiObjectiveIndividual<Genome>]) -> Vec<Genome> {
        let feature = &self.config.feature;
        let mut offspring = Vec::with_capacity(feature.population_size);

        while offspring.len() < feature.population_size {
            let parent1 = &ranked[pareto_tournament_selection(ranked, feature.tournament_size, &mut self.rng)].data;
            let parent2 = &ranked[pareto_tournament_selection(ranked, feature.tournament_size, &mut self.rng)].data;

            let (mut child1, mut child2) = if self.rng.gen::<f64>() < feature.crossover_rate {
                uniform_crossover(parent1, parent2, &mut self.rng)
            } else {
                (Genome::new(parent1.genes.clone()), Genome::new(parent2.genes.clone()))
            };
            mutate(&mut child1, feature.mutation_rate, &mut self.rng);
            mutate(&mut child2, feature.mutation_rate, &mut self.rng);

            offspring.push(child1);
            if offspring.len() < feature.population_size {
                offspring.push(child2);
            }
        }
        offspring
    }
}

