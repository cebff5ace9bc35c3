use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::mpsc::{Receiver, SyncSender, TrySendError};
use std::sync::{mpsc, Arc};

/// Notifications the search emits for persistence and progress display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SearchEvent {
    CandidateEvaluated {
        construction: String,
        dataset: String,
        /// Mean loss, or the failure message
        outcome: Result<f64, String>,
        fold_runtimes_ms: Vec<u64>,
        timestamp: DateTime<Utc>,
    },
    FeatureExtractorRated {
        construction: String,
        score: f64,
        candidate_scores: Vec<Option<f64>>,
        usage_count: usize,
        timestamp: DateTime<Utc>,
    },
    RegressionResultFound {
        construction: String,
        performance: Option<f64>,
        timestamp: DateTime<Utc>,
    },
    NewIncumbent {
        construction: String,
        performance: f64,
        timestamp: DateTime<Utc>,
    },
    FatalFailure {
        reason: String,
        timestamp: DateTime<Utc>,
    },
}

impl SearchEvent {
    pub fn fatal(reason: impl Into<String>) -> Self {
        SearchEvent::FatalFailure {
            reason: reason.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Receives search events. Implementations must return promptly.
pub trait EventSink: Send + Sync {
    fn publish(&self, event: SearchEvent);
}

/// Writes every event to the log.
pub struct LoggingSink;

impl EventSink for LoggingSink {
    fn publish(&self, event: SearchEvent) {
        match event {
            SearchEvent::CandidateEvaluated { construction, dataset, outcome, fold_runtimes_ms, .. } => match outcome {
                Ok(score) => log::info!(
                    "Evaluated {} on {}: {:.4} (fold runtimes {:?} ms)",
                    construction, dataset, score, fold_runtimes_ms
                ),
                Err(reason) => log::info!("Evaluation of {} on {} failed: {}", construction, dataset, reason),
            },
            SearchEvent::FeatureExtractorRated { construction, score, usage_count, .. } => {
                log::info!("Rated {}: {:.4} (used by {} regressors)", construction, score, usage_count)
            }
            SearchEvent::RegressionResultFound { construction, performance, .. } => {
                log::info!("Regression search result {}: {:?}", construction, performance)
            }
            SearchEvent::NewIncumbent { construction, performance, .. } => {
                log::info!("New incumbent {:.4}: {}", performance, construction)
            }
            SearchEvent::FatalFailure { reason, .. } => log::error!("Fatal failure: {}", reason),
        }
    }
}

/// Forwards events over a bounded channel, dropping them when the consumer lags.
pub struct ChannelSink {
    sender: SyncSender<SearchEvent>,
}

impl ChannelSink {
    pub fn new(capacity: usize) -> (Self, Receiver<SearchEvent>) {
        let (sender, receiver) = mpsc::sync_channel(capacity);
        (Self { sender }, receiver)
    }
}

impl EventSink for ChannelSink {
    fn publish(&self, event: SearchEvent) {
        match self.sender.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => log::warn!("Event channel full, dropping event"),
            Err(TrySendError::Disconnected(_)) => {}
        }
    }
}

/// Publishes to several sinks in order.
#[derive(Default)]
pub struct FanoutSink {
    sinks: Vec<Arc<dyn EventSink>>,
}

impl FanoutSink {
    pub fn new(sinks: Vec<Arc<dyn EventSink>>) -> Self {
        Self { sinks }
    }

    pub fn push(&mut self, sink: Arc<dyn EventSink>) {
        self.sinks.push(sink);
    }
}

impl EventSink for FanoutSink {
    fn publish(&self, event: SearchEvent) {
        for sink in &self.sinks {
            sink.publish(event.clone());
        }
    }
}

pub struct NullSink;

impl EventSink for NullSink {
    fn publish(&self, _event: SearchEvent) {}
}
