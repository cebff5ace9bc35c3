use super::traits::ConfigSection;
use crate::error::{CoevoError, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub union_combinator: String,
    pub pipeline_combinator: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            union_combinator: "sklearn.pipeline.make_union".to_string(),
            pipeline_combinator: "sklearn.pipeline.make_pipeline".to_string(),
        }
    }
}

impl ConfigSection for PipelineConfig {
    fn section_name() -> &'static str {
        "pipeline"
    }

    fn validate(&self) -> Result<()> {
        if self.union_combinator.is_empty() || self.pipeline_combinator.is_empty() {
            return Err(CoevoError::Configuration("Combinator names must not be empty".to_string()));
        }
        Ok(())
    }
}
