use thiserror::Error;

#[derive(Debug, Error)]
pub enum DataError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("corrupt data: {0}")]
    Corrupt(String),

    #[error("invalid: {0}")]
    Invalid(String),

    #[error(transparent)]
    Common(#[from] oneseq_common::OneSeqError),
}

pub type Result<T> = std::result::Result<T, DataError>;
