use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    /// The pipeline has been stopped; the intent was not accepted.
    /// Producers must tolerate this without panicking.
    #[error("delete pipeline is stopped")]
    Stopped,
}
