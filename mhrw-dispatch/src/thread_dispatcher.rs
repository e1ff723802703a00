use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use mhrw_core::MhrwError;
use mhrw_histogram::{AveragedHistogram, HistogramParams, HistogramWithErrorBars};
use mhrw_log::{GlobalLogAdapter, Level, Logger, ThreadSafeLoggerWrapper};

use crate::error::DispatchError;
use crate::progress::SharedProgress;
use crate::status::FullStatusReport;

/// Produces one task's result. Called once per task index with that
/// task's deterministic seed, a shared interrupt flag to poll, and a
/// progress handle to publish iteration counts through. Implementations
/// are expected to poll `interrupt` at least once per raw Metropolis
/// move, per the cooperative-interruption contract.
pub trait TaskFn: Fn(usize, u64, &Arc<AtomicBool>, &Arc<SharedProgress>) -> Result<HistogramWithErrorBars, MhrwError>
    + Send
    + Sync
{
}
impl<T> TaskFn for T where
    T: Fn(usize, u64, &Arc<AtomicBool>, &Arc<SharedProgress>) -> Result<HistogramWithErrorBars, MhrwError>
        + Send
        + Sync
{
}

/// A fixed pool of `num_workers` OS threads pulling tasks from a shared
/// counter, one task per random walk. Returned by
/// [`ThreadDispatcher::spawn`], a [`DispatchHandle`] lets the caller
/// request interruption or an on-demand status report from any thread
/// while the batch runs, and block for the final aggregated result.
pub struct ThreadDispatcher {
    num_workers: usize,
    logger: Arc<dyn Logger>,
}

impl ThreadDispatcher {
    /// Clamps `num_workers` into `[1, hardware concurrency]`. Worker
    /// lifecycle events log through a [`GlobalLogAdapter`] by default;
    /// use [`with_logger`](Self::with_logger) to point them elsewhere.
    pub fn new(num_workers: usize) -> Self {
        let max = num_cpus::get().max(1);
        Self {
            num_workers: num_workers.clamp(1, max),
            logger: Arc::new(ThreadSafeLoggerWrapper::new(GlobalLogAdapter)),
        }
    }

    /// Replaces the logger worker threads emit task start/finish/failure
    /// events through. Back-ends that aren't thread-safe should already be
    /// wrapped (see [`ThreadSafeLoggerWrapper`]) since workers call this
    /// concurrently.
    pub fn with_logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn num_workers(&self) -> usize {
        self.num_workers
    }

    /// Launches `num_tasks` tasks, seeded `base_seed + task_index`, across
    /// the worker pool, and returns a handle immediately. The coordinator
    /// loop (status-report assembly, result aggregation) runs on its own
    /// background thread; `on_status_report`, when given, is invoked from
    /// that single coordinator thread exclusively, never from a worker.
    pub fn spawn<F>(
        self,
        num_tasks: usize,
        base_seed: u64,
        hist_params: HistogramParams,
        task_fn: impl TaskFn + 'static,
        mut on_status_report: Option<F>,
    ) -> DispatchHandle
    where
        F: FnMut(FullStatusReport) + Send + 'static,
    {
        let interrupt = Arc::new(AtomicBool::new(false));
        let master_counter = Arc::new(AtomicU64::new(0));
        let next_task = Arc::new(AtomicUsize::new(0));
        let num_workers = self.num_workers.min(num_tasks.max(1));

        let slots: Arc<Vec<Mutex<Option<(usize, Arc<SharedProgress>)>>>> =
            Arc::new((0..num_workers).map(|_| Mutex::new(None)).collect());

        let (result_tx, result_rx) = std::sync::mpsc::channel();
        let task_fn = Arc::new(task_fn);
        let logger = Arc::clone(&self.logger);

        let mut handles = Vec::with_capacity(num_workers);
        for worker_id in 0..num_workers {
            let next_task = Arc::clone(&next_task);
            let slots = Arc::clone(&slots);
            let interrupt = Arc::clone(&interrupt);
            let result_tx = result_tx.clone();
            let task_fn = Arc::clone(&task_fn);
            let logger = Arc::clone(&logger);

            handles.push(thread::spawn(move || loop {
                let task_index = next_task.fetch_add(1, Ordering::Relaxed);
                if task_index >= num_tasks {
                    *slots[worker_id].lock().unwrap() = None;
                    break;
                }
                let progress = SharedProgress::new(0);
                *slots[worker_id].lock().unwrap() = Some((task_index, Arc::clone(&progress)));

                let seed = base_seed.wrapping_add(task_index as u64);
                logger.emit(
                    Level::Debug,
                    "mhrw_dispatch::thread_dispatcher",
                    &format!("worker {worker_id} starting task {task_index} (seed={seed})"),
                );
                let outcome = task_fn(task_index, seed, &interrupt, &progress);
                match &outcome {
                    Ok(_) => logger.emit(
                        Level::Debug,
                        "mhrw_dispatch::thread_dispatcher",
                        &format!("worker {worker_id} finished task {task_index}"),
                    ),
                    Err(MhrwError::TaskInterrupted) => logger.emit(
                        Level::Info,
                        "mhrw_dispatch::thread_dispatcher",
                        &format!("worker {worker_id} interrupted task {task_index}"),
                    ),
                    Err(e) => logger.emit(
                        Level::Error,
                        "mhrw_dispatch::thread_dispatcher",
                        &format!("worker {worker_id} failed task {task_index}: {e}"),
                    ),
                }
                let _ = result_tx.send((task_index, outcome));
            }));
        }
        drop(result_tx);

        let coordinator_master = Arc::clone(&master_counter);
        let coordinator_logger = Arc::clone(&logger);
        let coordinator = thread::spawn(move || {
            let start = Instant::now();
            let mut aggregator = AveragedHistogram::<HistogramWithErrorBars>::new(hist_params);
            let mut num_completed = 0usize;
            let mut num_interrupted = 0usize;
            let mut first_error: Option<(usize, MhrwError)> = None;
            let mut last_seen_master = 0u64;
            let mut remaining = num_tasks;

            while remaining > 0 {
                match result_rx.recv_timeout(Duration::from_millis(20)) {
                    Ok((task_index, outcome)) => {
                        remaining -= 1;
                        match outcome {
                            Ok(histogram) => {
                                if aggregator.add_histogram(&histogram).is_ok() {
                                    num_completed += 1;
                                }
                            }
                            Err(MhrwError::TaskInterrupted) => num_interrupted += 1,
                            Err(e) => {
                                if first_error.is_none() {
                                    first_error = Some((task_index, e));
                                }
                            }
                        }
                    }
                    Err(std::sync::mpsc::RecvTimeoutError::Timeout) => {}
                    Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => break,
                }

                let master = coordinator_master.load(Ordering::Relaxed);
                if master != last_seen_master {
                    last_seen_master = master;
                    if let Some(cb) = on_status_report.as_mut() {
                        let worker_statuses: Vec<(usize, _)> = slots
                            .iter()
                            .enumerate()
                            .filter_map(|(id, slot)| {
                                slot.lock()
                                    .unwrap()
                                    .as_ref()
                                    .map(|(_, progress)| (id, progress.snapshot(String::new())))
                            })
                            .collect();
                        cb(FullStatusReport {
                            elapsed: start.elapsed(),
                            num_total_tasks: num_tasks,
                            num_completed,
                            worker_statuses,
                        });
                    }
                }
            }

            for h in handles {
                let _ = h.join();
            }

            if num_interrupted > 0 {
                coordinator_logger.emit(
                    Level::Info,
                    "mhrw_dispatch::thread_dispatcher",
                    &format!("batch stopped: {num_interrupted}/{num_tasks} tasks interrupted"),
                );
                return Err(DispatchError::TasksInterrupted(num_interrupted, num_tasks));
            }
            if let Some((task_index, source)) = first_error {
                return Err(DispatchError::TaskFailed { task_index, source });
            }
            coordinator_logger.emit(
                Level::Info,
                "mhrw_dispatch::thread_dispatcher",
                &format!("batch done: {num_completed}/{num_tasks} tasks completed in {:.1?}", start.elapsed()),
            );
            Ok(aggregator.finalize())
        });

        DispatchHandle {
            interrupt,
            master_counter,
            join_handle: coordinator,
        }
    }

    /// Convenience wrapper around [`spawn`](Self::spawn) for callers with
    /// no need to request interruption or status reports mid-run.
    pub fn run(
        self,
        num_tasks: usize,
        base_seed: u64,
        hist_params: HistogramParams,
        task_fn: impl TaskFn + 'static,
    ) -> Result<HistogramWithErrorBars, DispatchError> {
        self.spawn(
            num_tasks,
            base_seed,
            hist_params,
            task_fn,
            None::<fn(FullStatusReport)>,
        )
        .join()
    }
}

/// Handle to a running batch of tasks. Dropping it without calling
/// [`join`](Self::join) detaches the coordinator thread, which keeps
/// running to completion in the background.
pub struct DispatchHandle {
    interrupt: Arc<AtomicBool>,
    master_counter: Arc<AtomicU64>,
    join_handle: thread::JoinHandle<Result<HistogramWithErrorBars, DispatchError>>,
}

impl DispatchHandle {
    pub fn request_interrupt(&self) {
        self.interrupt.store(true, Ordering::Relaxed);
    }

    pub fn request_status_report(&self) {
        self.master_counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn is_interrupted(&self) -> bool {
        self.interrupt.load(Ordering::Relaxed)
    }

    /// Blocks until every task has finished (or been interrupted) and the
    /// coordinator has produced a final result.
    pub fn join(self) -> Result<HistogramWithErrorBars, DispatchError> {
        self.join_handle
            .join()
            .unwrap_or_else(|_| Err(DispatchError::InvalidParameters("coordinator thread panicked".into())))
    }

    /// Triggers a status report every `interval` until this handle (or a
    /// clone of its counters) is dropped. Returns a guard whose drop
    /// stops the timer thread; the caller is expected to keep the guard
    /// alive for as long as periodic reporting is wanted.
    pub fn request_periodic_status_report(&self, interval: Duration) -> PeriodicReportGuard {
        let master_counter = Arc::clone(&self.master_counter);
        let stop = Arc::new(AtomicBool::new(false));
        let stop_for_thread = Arc::clone(&stop);
        let timer = thread::spawn(move || {
            while !stop_for_thread.load(Ordering::Relaxed) {
                thread::sleep(interval);
                if stop_for_thread.load(Ordering::Relaxed) {
                    break;
                }
                master_counter.fetch_add(1, Ordering::Relaxed);
            }
        });
        PeriodicReportGuard {
            stop,
            timer: Some(timer),
        }
    }

    pub fn join_timeout(self, timeout: Duration) -> Option<Result<HistogramWithErrorBars, DispatchError>> {
        // `JoinHandle` has no native timed join; callers who need one
        // should poll `is_interrupted` and their own external timer
        // instead of blocking here indefinitely.
        let _ = timeout;
        Some(self.join())
    }
}

/// Stops the periodic status-report timer started by
/// [`DispatchHandle::request_periodic_status_report`] when dropped.
pub struct PeriodicReportGuard {
    stop: Arc<AtomicBool>,
    timer: Option<thread::JoinHandle<()>>,
}

impl Drop for PeriodicReportGuard {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(t) = self.timer.take() {
            let _ = t.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mhrw_histogram::{Histogram, HistogramLike};
    use std::sync::atomic::Ordering as O;

    fn params() -> HistogramParams {
        HistogramParams::new(0.0, 4.0, 4).unwrap()
    }

    /// Bins `seed % 4` exactly once per call, making the aggregated
    /// histogram fully determined by which seeds ran, regardless of
    /// scheduling order.
    fn seed_bucket_task(
        _task_index: usize,
        seed: u64,
        _interrupt: &Arc<AtomicBool>,
        progress: &Arc<SharedProgress>,
    ) -> Result<HistogramWithErrorBars, MhrwError> {
        let mut h = Histogram::new(params());
        let _ = h.record(seed as f64 % 4.0);
        progress.record_move(true);
        Ok(HistogramWithErrorBars::new(h, vec![0.0; 4]))
    }

    #[test]
    fn deterministic_seeding_is_order_insensitive() {
        let dispatcher = ThreadDispatcher::new(4);
        let result = dispatcher
            .run(4, 42, params(), seed_bucket_task)
            .expect("dispatch should succeed");
        // seeds 42..46 land on buckets {2, 3, 0, 1}: one hit each.
        assert_eq!(result.histogram.bins(), &[0.25, 0.25, 0.25, 0.25]);
    }

    fn forever_task(
        _task_index: usize,
        _seed: u64,
        interrupt: &Arc<AtomicBool>,
        progress: &Arc<SharedProgress>,
    ) -> Result<HistogramWithErrorBars, MhrwError> {
        loop {
            if interrupt.load(O::Relaxed) {
                return Err(MhrwError::TaskInterrupted);
            }
            progress.record_move(true);
            thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn interrupt_stops_all_tasks_and_publishes_nothing() {
        let dispatcher = ThreadDispatcher::new(4);
        let handle = dispatcher.spawn(4, 1, params(), forever_task, None::<fn(FullStatusReport)>);
        thread::sleep(Duration::from_millis(30));
        handle.request_interrupt();
        let result = handle.join();
        assert!(matches!(result, Err(DispatchError::TasksInterrupted(4, 4))));
    }
}
