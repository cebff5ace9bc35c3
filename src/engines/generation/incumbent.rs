use crate::engines::events::{EventSink, SearchEvent};
use crate::types::PipelineReport;
use chrono::Utc;
use std::sync::{Arc, Mutex, PoisonError};

/// Holds the best end-to-end pipeline found so far, across both searches.
pub struct IncumbentTracker {
    current: Mutex<Arc<PipelineReport>>,
    events: Arc<dyn EventSink>,
}

impl IncumbentTracker {
    pub fn new(events: Arc<dyn EventSink>) -> Self {
        Self {
            current: Mutex::new(Arc::new(PipelineReport::worst())),
            events,
        }
    }

    /// Replace the incumbent iff `candidate` succeeded and is strictly better.
    /// The `none_found` sentinel is never accepted.
    /// Returns whether it was replaced.
    pub fn update(&self, candidate: &PipelineReport) -> bool {
        if candidate.is_none_found() {
            return false;
        }
        let performance = match candidate.performance {
            Some(p) if !p.is_nan() => p,
            _ => return false,
        };

        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        let held = current.performance.unwrap_or(f64::MAX);
        if performance >= held {
            return false;
        }
        *current = Arc::new(candidate.clone());
        drop(current);

        self.events.publish(SearchEvent::NewIncumbent {
            construction: candidate.construction.clone(),
            performance,
            timestamp: Utc::now(),
        });
        true
    }

    pub fn snapshot(&self) -> Arc<PipelineReport> {
        Arc::clone(&self.current.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engines::events::{ChannelSink, NullSink};
    use crate::types::TimeWindow;
    use std::collections::BTreeSet;
    use std::thread;

    fn report(construction: &str, performance: Option<f64>) -> PipelineReport {
        PipelineReport::new(construction, BTreeSet::new(), performance, TimeWindow::instant())
    }

    #[test]
    fn test_only_strict_improvements_replace() {
        let (sink, receiver) = ChannelSink::new(8);
        let tracker = IncumbentTracker::new(Arc::new(sink));

        assert!(tracker.update(&report("a", Some(10.0))));
        assert!(!tracker.update(&report("b", Some(10.0))));
        assert!(!tracker.update(&report("c", Some(11.0))));
        assert!(tracker.update(&report("d", Some(2.0))));
        assert_eq!(tracker.snapshot().construction, "d");
        assert_eq!(receiver.try_iter().count(), 2);
    }

    #[test]
    fn test_failed_candidate_never_replaces() {
        let tracker = IncumbentTracker::new(Arc::new(NullSink));
        assert!(!tracker.update(&report("failed", None)));
        assert_eq!(tracker.snapshot().performance, Some(f64::MAX));

        tracker.update(&report("ok", Some(5.0)));
        assert!(!tracker.update(&report("failed", None)));
        assert_eq!(tracker.snapshot().construction, "ok");
    }

    #[test]
    fn test_none_found_sentinel_is_ignored() {
        let tracker = IncumbentTracker::new(Arc::new(NullSink));
        assert!(!tracker.update(&PipelineReport::none_found()));
        assert_eq!(tracker.snapshot().performance, Some(f64::MAX));
    }

    #[test]
    fn test_concurrent_updates_keep_minimum() {
        for _ in 0..20 {
            let tracker = Arc::new(IncumbentTracker::new(Arc::new(NullSink)));
            let handles: Vec<_> = [7.0, 3.0, 9.0, 4.0]
                .into_iter()
                .map(|p| {
                    let tracker = Arc::clone(&tracker);
                    thread::spawn(move || {
                        tracker.update(&report(&format!("p{}", p), Some(p)));
                    })
                })
                .collect();
            for handle in handles {
                handle.join().unwrap();
            }
            assert_eq!(tracker.snapshot().performance, Some(3.0));
        }
    }
}
