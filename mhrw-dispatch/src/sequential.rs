use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use mhrw_core::MhrwError;
use mhrw_histogram::{AveragedHistogram, HistogramParams, HistogramWithErrorBars};

use crate::error::DispatchError;
use crate::progress::SharedProgress;

/// Runs every task on the calling thread, one after another. Useful for
/// debugging a task closure without thread interleaving, and as a
/// single-threaded fallback on platforms where spawning OS threads isn't
/// available. Produces byte-identical aggregation to
/// [`crate::ThreadDispatcher`] given the same seeds, since
/// `AveragedHistogram` is order-insensitive.
pub struct SequentialDispatcher;

impl SequentialDispatcher {
    pub fn run<T>(
        num_tasks: usize,
        base_seed: u64,
        hist_params: HistogramParams,
        task_fn: T,
    ) -> Result<HistogramWithErrorBars, DispatchError>
    where
        T: Fn(usize, u64, &Arc<AtomicBool>, &Arc<SharedProgress>) -> Result<HistogramWithErrorBars, MhrwError>,
    {
        let interrupt = Arc::new(AtomicBool::new(false));
        let mut aggregator = AveragedHistogram::<HistogramWithErrorBars>::new(hist_params);
        let mut num_interrupted = 0usize;

        for task_index in 0..num_tasks {
            let seed = base_seed.wrapping_add(task_index as u64);
            let progress = SharedProgress::new(0);
            match task_fn(task_index, seed, &interrupt, &progress) {
                Ok(histogram) => {
                    aggregator
                        .add_histogram(&histogram)
                        .map_err(|e| DispatchError::InvalidParameters(e.to_string()))?;
                }
                Err(MhrwError::TaskInterrupted) => num_interrupted += 1,
                Err(source) => return Err(DispatchError::TaskFailed { task_index, source }),
            }
        }

        if num_interrupted > 0 {
            return Err(DispatchError::TasksInterrupted(num_interrupted, num_tasks));
        }
        Ok(aggregator.finalize())
    }
}
