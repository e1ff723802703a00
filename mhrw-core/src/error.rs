use thiserror::Error;

/// Error taxonomy for the MHRW engine (see the error-handling design).
/// `InvalidParameters` and `InternalInvariant` are fatal and abort the
/// owning task; `TaskInterrupted` is recovered by the dispatcher into
/// `TasksInterrupted` once all tasks have wound down.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MhrwError {
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("internal invariant violated: {0}")]
    InternalInvariant(String),

    #[error("task interrupted")]
    TaskInterrupted,
}

impl From<mhrw_histogram::HistogramError> for MhrwError {
    fn from(e: mhrw_histogram::HistogramError) -> Self {
        MhrwError::InvalidParameters(e.to_string())
    }
}
