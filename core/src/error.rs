use crate::MovieId;

/// Failure kinds surfaced to callers of the recommender.
#[derive(thiserror::Error, Debug)]
pub enum RecommendError {
    #[error("Models are not ready")]
    NotReady,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Movie ID {0} not found")]
    NotFound(MovieId),

    #[error("Data load error: {0}")]
    DataLoad(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl RecommendError {
    /// Wrap an artifact loading failure, keeping the whole context chain.
    pub fn data_load(err: anyhow::Error) -> Self {
        RecommendError::DataLoad(format!("{err:#}"))
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, RecommendError::NotReady)
    }
}

pub type RecommendResult<T> = Result<T, RecommendError>;
