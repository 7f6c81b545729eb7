use thiserror::Error;

#[derive(Debug, Error)]
pub enum OneSeqError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("FASTA error: {0}")]
    Fasta(String),

    #[error("invalid taxon spec '{spec}': {reason}")]
    InvalidTaxon { spec: String, reason: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("taxonomy error: {0}")]
    Taxonomy(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, OneSeqError>;
