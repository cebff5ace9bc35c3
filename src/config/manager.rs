use super::{
    experiment::ExperimentConfig,
    feature::FeatureConfig,
    pipeline::PipelineConfig,
    regression::RegressionConfig,
    traits::ConfigSection,
};
use crate::error::{CoevoError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub experiment: ExperimentConfig,
    pub feature: FeatureConfig,
    pub regression: RegressionConfig,
    pub pipeline: PipelineConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<()> {
        self.experiment.validate()?;
        self.feature.validate()?;
        self.regression.validate()?;
        self.pipeline.validate()?;
        Ok(())
    }

    /// Budget for a single fold of a feature-extractor evaluation.
    pub fn feature_fold_timeout(&self) -> Duration {
        self.feature.candidate_timeout() / self.experiment.folds.max(1) as u32
    }

    /// Wall-clock limit for evaluating one outer generation.
    pub fn generation_deadline(&self) -> Duration {
        let population = self.feature.population_size as u32;
        self.feature.candidate_timeout() * population + Duration::from_secs(population as u64)
    }

    /// Time for one inner regression search, capped by what is left of the total budget.
    pub fn inner_search_timeout(&self, remaining: Duration) -> Duration {
        let population = self.regression.population_size as u32;
        let wanted = self.regression.candidate_timeout() * population + Duration::from_secs(population as u64);
        wanted.min(remaining)
    }
}

pub struct ConfigManager {
    config: Arc<RwLock<AppConfig>>,
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigManager {
    pub fn new() -> Self {
        Self {
            config: Arc::new(RwLock::new(AppConfig::default())),
        }
    }

    /// Load a TOML file, then apply `COEVO__SECTION__KEY` environment overrides.
    pub fn load_from_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(
                config::Environment::with_prefix("COEVO")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: AppConfig = settings.try_deserialize()?;
        config.validate()?;

        *self.config.write().unwrap_or_else(PoisonError::into_inner) = config;
        log::info!("Loaded configuration from {}", path.as_ref().display());
        Ok(())
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let config = self.get();
        let toml_str = toml::to_string_pretty(&config)
            .map_err(|e| CoevoError::Configuration(format!("Failed to serialize: {}", e)))?;

        std::fs::write(path, toml_str)?;
        Ok(())
    }

    pub fn get(&self) -> AppConfig {
        self.config.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn update<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&mut AppConfig),
    {
        let mut candidate = self.get();
        f(&mut candidate);
        candidate.validate()?;
        *self.config.write().unwrap_or_else(PoisonError::into_inner) = candidate;
        Ok(())
    }
}
