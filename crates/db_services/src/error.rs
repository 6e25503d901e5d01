use thiserror::Error;

#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("embedding failed: {0}")]
    Encoding(String),

    #[error("vector index error: {0}")]
    Index(String),

    #[error("retrieval configuration error: {0}")]
    Configuration(String),

    #[error("failed to read translation pairs: {0}")]
    Pairs(String),
}
