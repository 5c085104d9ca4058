#[derive(thiserror::Error, Debug)]
pub enum TaxonomyError {
    #[error("no taxonomy node or document with id '{0}'")]
    NotFound(String),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("cannot nest a child below a third-level node")]
    DepthExceeded,
    #[error("document '{0}' was modified concurrently, reload and retry")]
    Conflict(String),
    #[error("persistence failure")]
    Persistence(#[from] sled::Error),
    #[error("failed to decode stored document")]
    Decode(#[from] minicbor::decode::Error),
    #[error("failed to encode document: {0}")]
    Encode(String),
}
