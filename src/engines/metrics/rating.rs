use crate::types::WORST_SCORE;
use serde::{Deserialize, Serialize};

/// Turns the scores of all regression candidates that used one feature extractor
/// into that extractor's objective value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FeatureRater {
    Average,
    Median,
    Minimum,
    NumberOfUsingRegressors,
}

impl Default for FeatureRater {
    fn default() -> Self {
        FeatureRater::Average
    }
}

impl FeatureRater {
    /// `None` entries are failed candidates; they count as uses but carry no score.
    pub fn rate(&self, scores: &[Option<f64>]) -> f64 {
        if let FeatureRater::NumberOfUsingRegressors = self {
            return -(scores.len() as f64);
        }

        let mut valid: Vec<f64> = scores.iter().flatten().copied().filter(|s| !s.is_nan()).collect();
        if valid.is_empty() {
            return WORST_SCORE;
        }
        match self {
            FeatureRater::Average => valid.iter().sum::<f64>() / valid.len() as f64,
            FeatureRater::Median => {
                valid.sort_by(|a, b| a.total_cmp(b));
                valid[valid.len() / 2]
            }
            FeatureRater::Minimum => valid.iter().copied().fold(f64::INFINITY, f64::min),
            FeatureRater::NumberOfUsingRegressors => -(scores.len() as f64),
        }
    }
}
