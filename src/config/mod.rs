pub mod traits;
pub mod experiment;
pub mod feature;
pub mod regression;
pub mod pipeline;
pub mod manager;

pub use manager::{ConfigManager, AppConfig};
pub use experiment::ExperimentConfig;
pub use feature::{FeatureConfig, WrapperActivationConfig};
pub use regression::RegressionConfig;
pub use pipeline::PipelineConfig;
pub use traits::ConfigSection;
