use super::service::{EvaluationError, EvaluationRequest, EvaluationService};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;

/// Run a fit-and-predict call on its own thread and give up after `request.timeout`.
/// A call that overruns keeps running detached; its result is discarded.
pub fn fit_and_predict_timed(
    service: Arc<dyn EvaluationService>,
    request: EvaluationRequest,
) -> Result<Vec<f64>, EvaluationError> {
    let timeout = request.timeout;
    let (sender, receiver) = mpsc::channel();

    let spawned = thread::Builder::new()
        .name("fit-and-predict".to_string())
        .spawn(move || {
            let _ = sender.send(service.fit_and_predict(&request));
        });
    if let Err(e) = spawned {
        return Err(EvaluationError::TrainingFailed(anyhow::Error::new(e)));
    }

    match receiver.recv_timeout(timeout) {
        Ok(result) => result,
        Err(mpsc::RecvTimeoutError::Timeout) => Err(EvaluationError::Timeout(timeout)),
        Err(mpsc::RecvTimeoutError::Disconnected) => Err(EvaluationError::TrainingFailed(anyhow::anyhow!(
            "evaluation worker terminated without a result"
        ))),
    }
}
