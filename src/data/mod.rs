pub mod cache;
pub mod folds;

pub use cache::{artifact_name, content_hash, ArtifactRegistry, SplitRole};
pub use folds::{DatasetRef, Fold, FoldSet};
