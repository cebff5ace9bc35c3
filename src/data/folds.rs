use super::cache::{artifact_name, SplitRole};
use serde::{Deserialize, Serialize};

/// Reference to a dataset the evaluation service can load, optionally asking it to
/// store the transformed output under `cache_as`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetRef {
    pub name: String,
    #[serde(default)]
    pub cache_as: Option<String>,
}

impl DatasetRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cache_as: None,
        }
    }

    pub fn cached_as(mut self, artifact: impl Into<String>) -> Self {
        self.cache_as = Some(artifact.into());
        self
    }
}

/// One train/test split with the test split's ground truth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fold {
    pub train: DatasetRef,
    pub test: DatasetRef,
    pub ground_truth: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoldSet {
    pub dataset: String,
    pub seed: u64,
    pub folds: Vec<Fold>,
}

impl FoldSet {
    pub fn new(dataset: impl Into<String>, seed: u64, folds: Vec<Fold>) -> Self {
        Self {
            dataset: dataset.into(),
            seed,
            folds,
        }
    }

    pub fn len(&self) -> usize {
        self.folds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.folds.is_empty()
    }

    /// Names of the cached feature-extractor outputs for one fold.
    pub fn artifact_names(&self, hash: &str, fold: usize) -> (String, String) {
        (
            artifact_name(hash, &self.dataset, self.seed, fold, SplitRole::Train),
            artifact_name(hash, &self.dataset, self.seed, fold, SplitRole::Test),
        )
    }
}
