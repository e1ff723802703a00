use thiserror::Error;

/// A histogram-level construction failure. Fatal: the caller passed
/// inconsistent parameters, there is no local recovery.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum HistogramError {
    #[error("invalid histogram parameters: {0}")]
    InvalidParameters(String),

    #[error("cannot combine histograms with different parameters")]
    MismatchedParams,
}

/// Raised by [`crate::HistogramParams::bin_index`] when a value is
/// non-finite or outside `[min, max)`. Recovered locally by the caller
/// (the value is routed to `off_chart`), never propagated as a task error.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("value is out of histogram range")]
pub struct OutOfRange;
