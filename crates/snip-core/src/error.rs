use thiserror::Error;

/// Result type for durable store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors produced by durable store backends.
///
/// `Conflict` is not a failure: it signals that the original URL is
/// already mapped and the caller should look up the pre-existing code.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("original url already mapped: {0}")]
    Conflict(String),
    #[error("record not found")]
    NotFound,
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),
    #[error("storage operation timed out: {0}")]
    Timeout(String),
    #[error("storage query failed: {0}")]
    Query(String),
    #[error("stored data is invalid: {0}")]
    InvalidData(String),
    #[error("storage operation failed: {0}")]
    Operation(String),
}

impl StoreError {
    /// Whether this error is the duplicate-original-URL signal.
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict(_))
    }
}

/// Returned when a candidate short code fails validation.
#[derive(Debug, Clone, Error)]
#[error("invalid short code: {0}")]
pub struct InvalidShortCode(pub String);
