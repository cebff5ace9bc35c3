//! Co-evolutionary search for regression pipelines: an outer NSGA-II over
//! feature-extraction configurations and an inner grammar-based search over
//! regressors that reuses the outer search's feature extractors.

pub mod components;
pub mod config;
pub mod data;
pub mod engines;
pub mod error;
pub mod types;

pub use components::{Component, ComponentInstance, ComponentRepository, Parameter, ParameterDomain, RequiredInterface};
pub use config::{AppConfig, ConfigManager};
pub use data::{DatasetRef, Fold, FoldSet};
pub use engines::evaluation::{EvaluationError, EvaluationRequest, EvaluationService};
pub use engines::events::{ChannelSink, EventSink, FanoutSink, LoggingSink, NullSink, SearchEvent};
pub use engines::generation::{CoevolutionEngine, CoevolutionResult, IncumbentTracker};
pub use error::{CoevoError, Result};
pub use types::{Objectives, PipelineReport};
