use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoevoError {
    /// Decoding produced no completely defined component tree.
    #[error("Configuration infeasible: {0}")]
    ConfigurationInfeasible(String),

    #[error("Evaluation timed out: {0}")]
    EvaluationTimeout(String),

    #[error("Evaluation failed: {0}")]
    EvaluationFailure(String),

    #[error("Search space empty: {0}")]
    SearchSpaceEmpty(String),

    /// A genome or descriptor references a component the repository does not know.
    #[error("Repository lookup failed: {0}")]
    RepositoryLookup(String),

    #[error("Generation error: {0}")]
    Generation(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serde error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),
}

impl CoevoError {
    /// Errors that must abort the whole run rather than a single unit of work.
    pub fn is_fatal(&self) -> bool {
        matches!(self, CoevoError::RepositoryLookup(_))
    }

    /// Errors that are scored as sentinels instead of being propagated.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            CoevoError::ConfigurationInfeasible(_)
                | CoevoError::EvaluationTimeout(_)
                | CoevoError::EvaluationFailure(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, CoevoError>;
