use crate::data::{content_hash, DatasetRef, FoldSet};
use crate::engines::evaluation::{fit_and_predict_timed, EvaluationRequest, EvaluationService};
use crate::engines::events::{EventSink, SearchEvent};
use crate::engines::generation::translator::DecodedSolution;
use crate::engines::metrics::LossMetric;
use chrono::Utc;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A feature extractor the regression search composes candidates with.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureExtractor {
    pub construction: String,
    pub imports: BTreeSet<String>,
    /// Key of the cached transformed datasets
    pub hash: String,
}

impl FeatureExtractor {
    pub fn new(construction: impl Into<String>, imports: BTreeSet<String>) -> Self {
        let construction = construction.into();
        let hash = content_hash(&construction, &imports);
        Self {
            construction,
            imports,
            hash,
        }
    }
}

impl From<&DecodedSolution> for FeatureExtractor {
    fn from(solution: &DecodedSolution) -> Self {
        Self::new(solution.construction.clone(), solution.imports.clone())
    }
}

/// Scores regressors on the cached output of a feature extractor.
pub struct PipelineEvaluator {
    service: Arc<dyn EvaluationService>,
    folds: Arc<FoldSet>,
    metric: LossMetric,
    clamp_predictions: bool,
    fold_timeout: Duration,
    events: Arc<dyn EventSink>,
}

impl PipelineEvaluator {
    pub fn new(
        service: Arc<dyn EvaluationService>,
        folds: Arc<FoldSet>,
        metric: LossMetric,
        clamp_predictions: bool,
        fold_timeout: Duration,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            service,
            folds,
            metric,
            clamp_predictions,
            fold_timeout,
            events,
        }
    }

    /// Mean loss over the folds that succeeded, or `None` if none did.
    ///
    /// The regressor alone is sent to the service; its train and test splits are the
    /// artifacts the feature extractor left behind under its content hash. `composed`
    /// names the full pipeline in the emitted event.
    pub fn evaluate(
        &self,
        extractor: &FeatureExtractor,
        regressor: &str,
        regressor_imports: &BTreeSet<String>,
        composed: &str,
        deadline: Instant,
    ) -> Option<f64> {
        let mut successes = Vec::with_capacity(self.folds.len());
        let mut fold_runtimes_ms = Vec::with_capacity(self.folds.len());
        let mut last_error = None;

        for (index, fold) in self.folds.folds.iter().enumerate() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                last_error = Some("regression search deadline reached".to_string());
                break;
            }

            let (train, test) = self.folds.artifact_names(&extractor.hash, index);
            let request = EvaluationRequest {
                construction: regressor.to_string(),
                imports: regressor_imports.clone(),
                train: DatasetRef::new(train),
                test: DatasetRef::new(test),
                timeout: self.fold_timeout.min(remaining),
            };

            let started = Instant::now();
            let result = fit_and_predict_timed(Arc::clone(&self.service), request);
            fold_runtimes_ms.push(started.elapsed().as_millis() as u64);

            match result {
                Ok(mut predictions) => {
                    if self.clamp_predictions {
                        predictions.iter_mut().for_each(|p| *p = p.max(0.0));
                    }
                    successes.push((fold.ground_truth.clone(), predictions));
                }
                Err(e) => {
                    log::debug!("Fold {} of {} failed: {}", index, composed, e);
                    last_error = Some(e.to_string());
                }
            }
        }

        let score = self.metric.averaged(&successes);
        let outcome = match score {
            Some(value) => Ok(value),
            None => Err(last_error.unwrap_or_else(|| "no fold produced a valid loss".to_string())),
        };
        self.events.publish(SearchEvent::CandidateEvaluated {
            construction: composed.to_string(),
            dataset: self.folds.dataset.clone(),
            outcome,
            fold_runtimes_ms,
            timestamp: Utc::now(),
        });
        score
    }
}
