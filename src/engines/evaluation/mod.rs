pub mod service;
pub mod timed;

pub use service::{EvaluationError, EvaluationRequest, EvaluationService};
pub use timed::fit_and_predict_timed;
