use std::time::Duration;

use mhrw_core::stats::TaskStatus;
use mhrw_util::format_duration;

/// A consistent snapshot of every active worker's [`TaskStatus`],
/// assembled by the coordinator once all expected reports for one round
/// have arrived. Handed to the user's status-report callback, which is
/// always invoked from the coordinator context (never from a worker
/// thread), so callers never need their own synchronization to read it.
#[derive(Debug, Clone)]
pub struct FullStatusReport {
    pub elapsed: Duration,
    pub num_total_tasks: usize,
    pub num_completed: usize,
    pub worker_statuses: Vec<(usize, TaskStatus)>,
}

impl FullStatusReport {
    /// Overall completion fraction across the whole batch: finished tasks
    /// count as 1.0 each, active workers contribute their own
    /// `fraction_done`, interpolating smoothly between status reports
    /// rather than jumping only when a task finishes.
    pub fn total_fraction_done(&self) -> f64 {
        if self.num_total_tasks == 0 {
            return 1.0;
        }
        let active_contribution: f64 = self
            .worker_statuses
            .iter()
            .map(|(_, s)| s.fraction_done)
            .sum();
        (self.num_completed as f64 + active_contribution) / self.num_total_tasks as f64
    }

    pub fn human_report(&self) -> String {
        let mut lines = Vec::with_capacity(self.worker_statuses.len() + 2);
        lines.push("=== Intermediate Progress Report ===".to_string());
        for (k, status) in &self.worker_statuses {
            lines.push(format!("=== {k}: {}", status.human_report()));
        }
        lines.push(format!(
            "{}s elapsed - {}/{} runs completed - {:.2}% total done",
            format_duration(self.elapsed),
            self.num_completed,
            self.num_total_tasks,
            100.0 * self.total_fraction_done(),
        ));
        lines.join("\n")
    }
}
