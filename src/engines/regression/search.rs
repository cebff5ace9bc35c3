use super::evaluator::{FeatureExtractor, PipelineEvaluator};
use super::grammar_mapper::GrammarMapper;
use super::operators::{crossover, mutate, random_genome, tournament_selection, Codons};
use crate::components::{Component, ComponentRepository, Parameter, ParameterDomain, RequiredInterface};
use crate::config::RegressionConfig;
use crate::engines::events::{EventSink, SearchEvent};
use crate::engines::generation::translator::PipelineTranslator;
use crate::engines::metrics::FeatureRater;
use crate::error::{CoevoError, Result};
use crate::types::{Objectives, PipelineReport, TimeWindow, WORST_SCORE};
use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Synthetic entry point injected into the regression grammar.
pub const SELECTOR_COMPONENT: &str = "ComponentToSearch";
/// Selector parameter indexing the feature extractors.
pub const FEATURE_EXTRACTOR_ID: &str = "feature_extractor_id";
const SELECTOR_REGRESSOR: &str = "regressor";

/// Long-lived collaborators shared by every inner search of a run.
#[derive(Clone)]
pub struct RegressionSearchContext {
    pub config: RegressionConfig,
    pub rater: FeatureRater,
    pub repository: Arc<ComponentRepository>,
    pub translator: Arc<PipelineTranslator>,
    pub evaluator: Arc<PipelineEvaluator>,
    pub events: Arc<dyn EventSink>,
}

/// Result of one inner search.
#[derive(Debug, Clone)]
pub struct RegressionOutcome {
    /// Objectives per feature extractor, in input order
    pub ratings: Vec<Objectives>,
    /// Best composed pipeline, or the "None" sentinel
    pub best: PipelineReport,
}

/// A mapped genotype ready for evaluation.
struct Candidate {
    extractor: usize,
    regressor: String,
    regressor_imports: BTreeSet<String>,
    composed: String,
    composed_imports: BTreeSet<String>,
}

/// Which extractor a rated genotype used and what it scored.
#[derive(Debug, Clone, Copy)]
struct Usage {
    extractor: Option<usize>,
    score: Option<f64>,
}

/// Grammar-based GP over regressors, composed with a fixed set of feature extractors.
pub struct RegressionSearch<'a> {
    context: &'a RegressionSearchContext,
    extractors: Vec<FeatureExtractor>,
    mapper: GrammarMapper,
}

impl<'a> RegressionSearch<'a> {
    /// Fails with `SearchSpaceEmpty` when there is nothing to compose with.
    pub fn new(context: &'a RegressionSearchContext, extractors: Vec<FeatureExtractor>) -> Result<Self> {
        if extractors.is_empty() {
            return Err(CoevoError::SearchSpaceEmpty(
                "No feasible feature extractor to search regressors for".to_string(),
            ));
        }

        let selector = Component::new(SELECTOR_COMPONENT)
            .provides(SELECTOR_COMPONENT)
            .with_parameter(Parameter::new(
                FEATURE_EXTRACTOR_ID,
                ParameterDomain::integer(0, extractors.len() as i64 - 1),
            ))
            .requires(RequiredInterface::single(
                SELECTOR_REGRESSOR,
                context.config.regressor_interface.as_str(),
            ));
        let augmented = Arc::new(context.repository.with_component(selector)?);

        Ok(Self {
            context,
            extractors,
            mapper: GrammarMapper::new(augmented, context.config.max_tree_depth),
        })
    }

    pub fn extractors(&self) -> &[FeatureExtractor] {
        &self.extractors
    }

    pub fn run(&self, seed: u64, timeout: Duration) -> Result<RegressionOutcome> {
        let config = &self.context.config;
        let started = Utc::now();
        let deadline = Instant::now() + timeout;
        let mut rng = StdRng::seed_from_u64(seed);

        let mut memo: HashMap<String, Option<f64>> = HashMap::new();
        let mut best: Option<PipelineReport> = None;
        let mut rated: Vec<Usage> = Vec::new();

        let mut population: Vec<Codons> = (0..config.population_size)
            .map(|_| random_genome(config.genome_length, &mut rng))
            .collect();

        for generation in 0..config.generations {
            let mut scored: Vec<(Codons, f64)> = Vec::with_capacity(population.len());
            let mut usage = Vec::with_capacity(population.len());

            for codons in population {
                if Instant::now() >= deadline {
                    break;
                }
                let entry = match self.express(&codons) {
                    Ok(candidate) => {
                        let score = match memo.get(&candidate.composed) {
                            Some(score) => *score,
                            None => {
                                let extractor = &self.extractors[candidate.extractor];
                                let score = self.context.evaluator.evaluate(
                                    extractor,
                                    &candidate.regressor,
                                    &candidate.regressor_imports,
                                    &candidate.composed,
                                    deadline,
                                );
                                memo.insert(candidate.composed.clone(), score);
                                score
                            }
                        };
                        if let Some(value) = score {
                            let improves = best
                                .as_ref()
                                .and_then(|b| b.performance)
                                .map_or(true, |current| value < current);
                            if improves {
                                best = Some(PipelineReport::new(
                                    candidate.composed.clone(),
                                    candidate.composed_imports.clone(),
                                    Some(value),
                                    TimeWindow::since(started),
                                ));
                            }
                        }
                        Usage {
                            extractor: Some(candidate.extractor),
                            score,
                        }
                    }
                    Err(e) if e.is_fatal() => return Err(e),
                    Err(e) => {
                        log::debug!("Genotype could not be mapped: {}", e);
                        Usage {
                            extractor: None,
                            score: None,
                        }
                    }
                };
                usage.push(entry);
                scored.push((codons, entry.score.unwrap_or(WORST_SCORE)));
            }

            let complete = scored.len() == config.population_size;
            if complete || rated.is_empty() {
                rated = usage;
            }
            log::debug!(
                "Regression generation {}: {} candidates rated, best {:?}",
                generation,
                scored.len(),
                best.as_ref().and_then(|b| b.performance)
            );

            if !complete || generation + 1 == config.generations {
                break;
            }
            population = self.breed(scored, &mut rng);
        }

        let ratings = self.rate(&rated);
        let best = best.unwrap_or_else(PipelineReport::none_found);
        self.context.events.publish(SearchEvent::RegressionResultFound {
            construction: best.construction.clone(),
            performance: best.performance,
            timestamp: Utc::now(),
        });

        Ok(RegressionOutcome { ratings, best })
    }

    fn express(&self, codons: &[u32]) -> Result<Candidate> {
        let root = self.mapper.map(codons, SELECTOR_COMPONENT)?;
        let extractor = root
            .parameter_value(FEATURE_EXTRACTOR_ID)
            .and_then(|v| v.parse::<usize>().ok())
            .filter(|i| *i < self.extractors.len())
            .ok_or_else(|| CoevoError::Generation(format!("Selector without a valid extractor index: {}", root)))?;
        let regressor = root
            .children(SELECTOR_REGRESSOR)
            .first()
            .ok_or_else(|| CoevoError::Generation(format!("Selector without a regressor: {}", root)))?;

        let translator = &self.context.translator;
        let (regressor, regressor_imports) = translator.translate(std::slice::from_ref(regressor));
        let feature = &self.extractors[extractor];
        let (composed, composed_imports) =
            translator.compose(&feature.construction, &feature.imports, &regressor, &regressor_imports);

        Ok(Candidate {
            extractor,
            regressor,
            regressor_imports,
            composed,
            composed_imports,
        })
    }

    /// Elitism, then tournament selection, single-point crossover and codon mutation.
    fn breed(&self, mut scored: Vec<(Codons, f64)>, rng: &mut StdRng) -> Vec<Codons> {
        let config = &self.context.config;
        scored.sort_by(|a, b| a.1.total_cmp(&b.1));

        let mut next: Vec<Codons> = scored
            .iter()
            .take(config.elitism_count)
            .map(|(codons, _)| codons.clone())
            .collect();

        while next.len() < config.population_size {
            let parent1 = tournament_selection(&scored, config.tournament_size, rng);
            let parent2 = tournament_selection(&scored, config.tournament_size, rng);

            let (mut child1, mut child2) = if rng.gen::<f64>() < config.crossover_rate {
                crossover(parent1, parent2, rng)
            } else {
                (parent1.clone(), parent2.clone())
            };
            mutate(&mut child1, config.mutation_rate, rng);
            mutate(&mut child2, config.mutation_rate, rng);

            next.push(child1);
            if next.len() < config.population_size {
                next.push(child2);
            }
        }
        next
    }

    fn rate(&self, rated: &[Usage]) -> Vec<Objectives> {
        self.extractors
            .iter()
            .enumerate()
            .map(|(index, extractor)| {
                let scores: Vec<Option<f64>> = rated
                    .iter()
                    .filter(|u| u.extractor == Some(index))
                    .map(|u| u.score)
                    .collect();
                let objectives = [
                    self.context.rater.rate(&scores),
                    FeatureRater::NumberOfUsingRegressors.rate(&scores),
                ];
                self.context.events.publish(SearchEvent::FeatureExtractorRated {
                    construction: extractor.construction.clone(),
                    score: objectives[0],
                    candidate_scores: scores.clone(),
                    usage_count: scores.len(),
                    timestamp: Utc::now(),
                });
                objectives
            })
            .collect()
    }
}
