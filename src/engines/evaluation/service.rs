use crate::data::DatasetRef;
use crate::error::CoevoError;
use std::collections::BTreeSet;
use std::time::Duration;
use thiserror::Error;

/// One fit-and-predict call: train `construction` on `train`, predict `test`.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationRequest {
    pub construction: String,
    pub imports: BTreeSet<String>,
    pub train: DatasetRef,
    pub test: DatasetRef,
    pub timeout: Duration,
}

#[derive(Error, Debug)]
pub enum EvaluationError {
    #[error("Evaluation timed out after {0:?}")]
    Timeout(Duration),

    #[error("Training failed: {0}")]
    TrainingFailed(#[source] anyhow::Error),
}

impl From<EvaluationError> for CoevoError {
    fn from(err: EvaluationError) -> Self {
        match err {
            EvaluationError::Timeout(_) => CoevoError::EvaluationTimeout(err.to_string()),
            EvaluationError::TrainingFailed(_) => CoevoError::EvaluationFailure(err.to_string()),
        }
    }
}

/// Trains and scores concrete pipelines on concrete splits.
///
/// Predictions are aligned with the instance order of the test split. When a
/// dataset reference carries `cache_as`, the service stores the transformed split
/// under that name; storing the same name twice must be harmless.
pub trait EvaluationService: Send + Sync {
    fn fit_and_predict(&self, request: &EvaluationRequest) -> Result<Vec<f64>, EvaluationError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion() {
        let timeout: CoevoError = EvaluationError::Timeout(Duration::from_secs(3)).into();
        assert!(matches!(timeout, CoevoError::EvaluationTimeout(_)));
        assert!(timeout.is_recoverable());

        let failed: CoevoError = EvaluationError::TrainingFailed(anyhow::anyhow!("segfault")).into();
        assert!(matches!(&failed, CoevoError::EvaluationFailure(msg) if msg.contains("segfault")));
    }
}
