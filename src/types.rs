use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Objective value for a genome whose evaluation ran out of time.
pub const WORST_OBJECTIVE_TIMEOUT: f64 = 10_000.0;

/// Objective value for a genome that could not be decoded or failed to train.
/// Strictly worse than the timeout sentinel.
pub const WORST_OBJECTIVE_INFEASIBLE: f64 = 20_000.0;

/// Score a feature rater assigns when no valid candidate score exists.
pub const WORST_SCORE: f64 = 10_000.0;

/// Construction string of the "nothing found" report.
pub const NONE_CONSTRUCTION: &str = "None";

/// Both objectives of an outer-search genome, minimised.
pub type Objectives = [f64; 2];

pub fn timeout_objectives() -> Objectives {
    [WORST_OBJECTIVE_TIMEOUT, WORST_OBJECTIVE_TIMEOUT]
}

pub fn infeasible_objectives() -> Objectives {
    [WORST_OBJECTIVE_INFEASIBLE, WORST_OBJECTIVE_INFEASIBLE]
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub started: DateTime<Utc>,
    pub finished: DateTime<Utc>,
}

impl TimeWindow {
    pub fn since(started: DateTime<Utc>) -> Self {
        Self {
            started,
            finished: Utc::now(),
        }
    }

    pub fn instant() -> Self {
        let now = Utc::now();
        Self {
            started: now,
            finished: now,
        }
    }
}

/// An end-to-end pipeline with its measured performance (lower is better).
/// `performance == None` marks a failed evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineReport {
    pub construction: String,
    pub imports: BTreeSet<String>,
    pub performance: Option<f64>,
    pub window: TimeWindow,
}

impl PipelineReport {
    pub fn new(construction: impl Into<String>, imports: BTreeSet<String>, performance: Option<f64>, window: TimeWindow) -> Self {
        Self {
            construction: construction.into(),
            imports,
            performance,
            window,
        }
    }

    /// Worst-possible starting point for the incumbent.
    pub fn worst() -> Self {
        Self::new("", BTreeSet::new(), Some(f64::MAX), TimeWindow::instant())
    }

    /// Sentinel returned when a regression search produced no usable candidate.
    pub fn none_found() -> Self {
        Self::new(NONE_CONSTRUCTION, BTreeSet::new(), Some(WORST_SCORE), TimeWindow::instant())
    }

    pub fn has_failed(&self) -> bool {
        self.performance.is_none()
    }

    pub fn is_none_found(&self) -> bool {
        self.construction == NONE_CONSTRUCTION
    }
}
