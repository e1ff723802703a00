use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use mhrw_core::stats::TaskStatus;

/// Per-worker progress counters, shared between the worker thread and the
/// coordinator. All fields are plain atomics so the worker's poll
/// (`should_report`) stays wait-free, and the coordinator can always read
/// a momentarily-stale but never torn snapshot without locking anything.
#[derive(Debug)]
pub struct SharedProgress {
    iteration: AtomicU64,
    total_iterations: AtomicU64,
    accepted: AtomicU64,
    moves: AtomicU64,
    last_seen_master: AtomicU64,
}

impl SharedProgress {
    pub fn new(total_iterations: u64) -> Arc<Self> {
        Arc::new(Self {
            iteration: AtomicU64::new(0),
            total_iterations: AtomicU64::new(total_iterations),
            accepted: AtomicU64::new(0),
            moves: AtomicU64::new(0),
            last_seen_master: AtomicU64::new(0),
        })
    }

    /// Lets a task fill in its total iteration count once it knows it
    /// (e.g. after validating its `MHRWParams`), since the dispatcher
    /// creates the handle before the task has built its parameters.
    pub fn set_total_iterations(&self, total: u64) {
        self.total_iterations.store(total, Ordering::Relaxed);
    }

    pub fn record_move(&self, accepted: bool) {
        self.iteration.fetch_add(1, Ordering::Relaxed);
        self.moves.fetch_add(1, Ordering::Relaxed);
        if accepted {
            self.accepted.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Cheap, wait-free check of whether a new status-report round has
    /// been requested since this worker last checked. Safe to call on
    /// every iteration, per the polling-frequency contract.
    pub fn should_report(&self, master_counter: &AtomicU64) -> bool {
        let master = master_counter.load(Ordering::Relaxed);
        let last_seen = self.last_seen_master.swap(master, Ordering::Relaxed);
        last_seen != master
    }

    pub fn snapshot(&self, message: String) -> TaskStatus {
        let iteration = self.iteration.load(Ordering::Relaxed);
        let moves = self.moves.load(Ordering::Relaxed);
        let accepted = self.accepted.load(Ordering::Relaxed);
        let total_iterations = self.total_iterations.load(Ordering::Relaxed);
        TaskStatus {
            fraction_done: if total_iterations == 0 {
                1.0
            } else {
                (iteration as f64 / total_iterations as f64).min(1.0)
            },
            iteration,
            total_iterations,
            acceptance_ratio: if moves > 0 {
                accepted as f64 / moves as f64
            } else {
                f64::NAN
            },
            message,
        }
    }
}
