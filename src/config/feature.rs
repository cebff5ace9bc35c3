use super::traits::ConfigSection;
use crate::engines::generation::strategy::SeedSpec;
use crate::engines::metrics::FeatureRater;
use crate::error::{CoevoError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Wrapper components that activate themselves when one of their features is active.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WrapperActivationConfig {
    pub wrapper_marker: String,
    pub child_interface: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    pub search_space: String,
    pub root_interface: String,
    /// Decode every active main component as its own root instead of starting at `root_interface`
    pub main_components_as_roots: bool,
    pub main_components: Vec<String>,
    pub main_components_without_activation: Vec<String>,
    pub population_size: usize,
    pub candidate_timeout_secs: u64,
    pub feature_rater: FeatureRater,
    pub crossover_rate: f64,
    pub mutation_rate: f64,
    pub tournament_size: usize,
    pub max_generations: Option<usize>,
    pub wrapper_activation: Option<WrapperActivationConfig>,
    pub seeds: Vec<SeedSpec>,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            search_space: "searchspace/timeseries/timeseries_feature_extraction.json".to_string(),
            root_interface: "TimeSeriesFeatureGenerator".to_string(),
            main_components_as_roots: false,
            main_components: [
                "python_connection.feature_generation.tsfresh_feature_generator.FCParametersDictionary",
                "pyts.transformation.BagOfPatterns",
                "pyts.transformation.BOSS",
                "pyts.transformation.ROCKET",
                "pyts.transformation.ShapeletTransform",
                "python_connection.feature_generation.ultra_fast_shapelets_feature_generator.UltraFastShapeletsFeatureExtractor",
                "pyts.transformation.WEASEL",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            main_components_without_activation: vec![
                "python_connection.feature_generation.tsfresh_feature_generator.FCParametersDictionary".to_string(),
            ],
            population_size: 10,
            candidate_timeout_secs: 5 * 60,
            feature_rater: FeatureRater::Average,
            crossover_rate: 0.9,
            mutation_rate: 0.1,
            tournament_size: 2,
            max_generations: None,
            wrapper_activation: None,
            seeds: Vec::new(),
        }
    }
}

impl FeatureConfig {
    pub fn candidate_timeout(&self) -> Duration {
        Duration::from_secs(self.candidate_timeout_secs)
    }
}

impl ConfigSection for FeatureConfig {
    fn section_name() -> &'static str {
        "feature"
    }

    fn validate(&self) -> Result<()> {
        if self.population_size < 2 {
            return Err(CoevoError::Configuration(
                "Feature population size must be at least 2".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.mutation_rate) {
            return Err(CoevoError::Configuration(
                "Mutation rate must be between 0 and 1".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.crossover_rate) {
            return Err(CoevoError::Configuration(
                "Crossover rate must be between 0 and 1".to_string(),
            ));
        }
        if self.tournament_size == 0 {
            return Err(CoevoError::Configuration("Tournament size must be at least 1".to_string()));
        }
        if self.candidate_timeout_secs == 0 {
            return Err(CoevoError::Configuration("Feature candidate timeout must be positive".to_string()));
        }
        Ok(())
    }
}
