//! Write-path orchestration for the snip URL shortener.
//!
//! [`LinkService`] coordinates the in-memory cache and the durable store
//! on every shorten call, resolves duplicate-URL conflicts to the
//! pre-existing code, and degrades to cache-plus-file when the store is
//! unavailable. Short code generation sits behind the [`Generator`]
//! seam.

pub mod error;
pub mod generator;
pub mod service;

pub use error::ServiceError;
pub use generator::{Generator, RandomGenerator, SeqGenerator};
pub use service::{LinkService, Shortened};
