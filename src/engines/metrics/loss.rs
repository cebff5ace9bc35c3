// src/engines/metrics/loss.rs
use serde::{Deserialize, Serialize};

/// Regression loss over aligned ground truth and predictions. Lower is better.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LossMetric {
    MeanSquaredError,
    RootMeanSquaredError,
    MeanAbsoluteError,
    /// PHM08 scoring: late predictions cost more than early ones.
    AsymmetricLoss,
}

impl Default for LossMetric {
    fn default() -> Self {
        LossMetric::AsymmetricLoss
    }
}

impl LossMetric {
    /// Loss of one fold. `None` if the inputs are empty or misaligned.
    pub fn loss(&self, ground_truth: &[f64], predictions: &[f64]) -> Option<f64> {
        if ground_truth.is_empty() || ground_truth.len() != predictions.len() {
            return None;
        }
        let n = ground_truth.len() as f64;
        let diffs = ground_truth.iter().zip(predictions).map(|(y, y_hat)| y_hat - y);

        let value = match self {
            LossMetric::MeanSquaredError => diffs.map(|d| d * d).sum::<f64>() / n,
            LossMetric::RootMeanSquaredError => (diffs.map(|d| d * d).sum::<f64>() / n).sqrt(),
            LossMetric::MeanAbsoluteError => diffs.map(f64::abs).sum::<f64>() / n,
            LossMetric::AsymmetricLoss => diffs.map(Self::phm08).sum::<f64>() / n,
        };
        Some(value)
    }

    /// Mean of the per-fold losses.
    pub fn averaged(&self, folds: &[(Vec<f64>, Vec<f64>)]) -> Option<f64> {
        let losses: Vec<f64> = folds
            .iter()
            .filter_map(|(truth, predictions)| self.loss(truth, predictions))
            .collect();
        if losses.is_empty() {
            return None;
        }
        Some(losses.iter().sum::<f64>() / losses.len() as f64)
    }

    fn phm08(d: f64) -> f64 {
        if d < 0.0 {
            (-d / 13.0).exp() - 1.0
        } else {
            (d / 10.0).exp() - 1.0
        }
    }
}
