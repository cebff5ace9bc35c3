use super::traits::ConfigSection;
use crate::engines::metrics::LossMetric;
use crate::error::{CoevoError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    pub dataset_name: String,
    pub seed: u64,
    pub folds: usize,
    /// Worker threads for batch evaluation
    pub cpus: usize,
    pub total_timeout_secs: u64,
    pub loss_metric: LossMetric,
    /// Clamp remaining-useful-life predictions at zero before scoring
    pub clamp_predictions: bool,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            dataset_name: "FD001".to_string(),
            seed: 42,
            folds: 5,
            cpus: 4,
            total_timeout_secs: 20 * 60,
            loss_metric: LossMetric::AsymmetricLoss,
            clamp_predictions: true,
        }
    }
}

impl ExperimentConfig {
    pub fn total_timeout(&self) -> Duration {
        Duration::from_secs(self.total_timeout_secs)
    }
}

impl ConfigSection for ExperimentConfig {
    fn section_name() -> &'static str {
        "experiment"
    }

    fn validate(&self) -> Result<()> {
        if self.dataset_name.is_empty() {
            return Err(CoevoError::Configuration("Dataset name must not be empty".to_string()));
        }
        if self.folds == 0 {
            return Err(CoevoError::Configuration("Number of folds must be at least 1".to_string()));
        }
        if self.cpus == 0 {
            return Err(CoevoError::Configuration("At least one cpu is required".to_string()));
        }
        if self.total_timeout_secs == 0 {
            return Err(CoevoError::Configuration("Total timeout must be positive".to_string()));
        }
        Ok(())
    }
}
