use super::traits::ConfigSection;
use crate::error::{CoevoError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegressionConfig {
    pub search_space: String,
    pub regressor_interface: String,
    pub population_size: usize,
    pub generations: usize,
    pub candidate_timeout_secs: u64,
    pub crossover_rate: f64,
    pub mutation_rate: f64,
    pub tournament_size: usize,
    pub elitism_count: usize,
    pub max_tree_depth: usize,
    pub genome_length: usize,
}

impl Default for RegressionConfig {
    fn default() -> Self {
        Self {
            search_space: "searchspace/regression/index.json".to_string(),
            regressor_interface: "AbstractRegressor".to_string(),
            population_size: 10,
            generations: 10,
            candidate_timeout_secs: 5 * 60,
            crossover_rate: 0.9,
            mutation_rate: 0.1,
            tournament_size: 2,
            elitism_count: 1,
            max_tree_depth: 8,
            genome_length: 64,
        }
    }
}

impl RegressionConfig {
    pub fn candidate_timeout(&self) -> Duration {
        Duration::from_secs(self.candidate_timeout_secs)
    }
}

impl ConfigSection for RegressionConfig {
    fn section_name() -> &'static str {
        "regression"
    }

    fn validate(&self) -> Result<()> {
        if self.population_size < 2 {
            return Err(CoevoError::Configuration(
                "Regression population size must be at least 2".to_string(),
            ));
        }
        if self.generations == 0 {
            return Err(CoevoError::Configuration("At least one regression generation is required".to_string()));
        }
        if !(0.0..=1.0).contains(&self.mutation_rate) || !(0.0..=1.0).contains(&self.crossover_rate) {
            return Err(CoevoError::Configuration(
                "Regression operator rates must be between 0 and 1".to_string(),
            ));
        }
        if self.elitism_count >= self.population_size {
            return Err(CoevoError::Configuration(
                "Elitism count must be smaller than the population size".to_string(),
            ));
        }
        if self.genome_length == 0 || self.max_tree_depth == 0 {
            return Err(CoevoError::Configuration(
                "Genome length and tree depth must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
