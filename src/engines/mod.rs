pub mod evaluation;
pub mod events;
pub mod generation;
pub mod metrics;
pub mod regression;
