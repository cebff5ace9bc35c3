pub mod loss;
pub mod rating;

pub use loss::LossMetric;
pub use rating::FeatureRater;
