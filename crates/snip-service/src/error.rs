use snip_core::StoreError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum ServiceError {
    /// The short code is absent from the cache. Reads never consult the
    /// durable store, so this is the only read-path failure.
    #[error("short code not found")]
    NotFound,
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}
