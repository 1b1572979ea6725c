use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid sampling range: {0}")]
    InvalidRange(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Document store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Empty dataset: {0}")]
    EmptyDataset(String),

    #[error("Invalid weights: {0}")]
    InvalidWeights(String),

    #[error("Risk sample {0} is outside the score domain")]
    OutOfDomain(i64),

    #[error("Corrupt cache: {0}")]
    CorruptCache(String),

    #[error("Inconsistent index: {0}")]
    InconsistentIndex(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Only transport failures may succeed on a later attempt.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::StoreUnavailable(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
