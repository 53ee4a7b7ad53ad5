//! Asynchronous batched deletion pipeline for the snip URL shortener.
//!
//! Soft-delete requests from any number of independent producers are
//! fanned in to a single consumer, buffered, and flushed to the durable
//! store in batches, by size or by time, with a graceful drain on
//! shutdown.

pub mod error;
pub mod pipeline;

pub use error::PipelineError;
pub use pipeline::{
    DeletePipeline, DeleteProducer, PipelineHandle, PipelineSettings, TombstoneStore,
};
