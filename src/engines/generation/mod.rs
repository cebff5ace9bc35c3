pub mod codec;
pub mod coordinator;
pub mod decoder;
pub mod evolution_engine;
pub mod genome;
pub mod incumbent;
pub mod pareto;
pub mod strategy;
pub mod translator;
pub mod variation;

pub use codec::{GenomeCodec, GenomeEntry};
pub use coordinator::{FeatureEvaluator, GenerationCoordinator, GenerationReport, GenomeEvaluation};
pub use decoder::{DecodeMode, PhenotypeDecoder};
pub use evolution_engine::{CoevolutionEngine, CoevolutionResult};
pub use genome::{Gene, Genome};
pub use incumbent::IncumbentTracker;
pub use pareto::{MultiObjectiveIndividual, OptimizationDirection};
pub use strategy::{BasicStrategy, GenomeStrategy, SeedSpec, WrapperActivationStrategy};
pub use translator::{DecodedSolution, PipelineTranslator};
