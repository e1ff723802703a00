use thiserror::Error;

/// Errors the dispatcher can surface once every worker has wound down.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// At least one task observed `requestInterrupt` and terminated early.
    /// Per the aggregation contract, no partial results are published
    /// when this is returned.
    #[error("{0} of {1} task(s) were interrupted")]
    TasksInterrupted(usize, usize),

    /// A task failed for a reason other than interruption; the first such
    /// failure observed is surfaced and the rest are discarded.
    #[error("task {task_index} failed: {source}")]
    TaskFailed {
        task_index: usize,
        #[source]
        source: mhrw_core::MhrwError,
    },

    #[error("invalid dispatch parameters: {0}")]
    InvalidParameters(String),
}
