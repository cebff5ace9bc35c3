pub mod evaluator;
pub mod gene_consumer;
pub mod grammar_mapper;
pub mod operators;
pub mod search;

pub use evaluator::{FeatureExtractor, PipelineEvaluator};
pub use gene_consumer::GeneConsumer;
pub use grammar_mapper::GrammarMapper;
pub use search::{
    RegressionOutcome, RegressionSearch, RegressionSearchContext, FEATURE_EXTRACTOR_ID, SELECTOR_COMPONENT,
};
