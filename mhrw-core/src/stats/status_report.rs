/// A worker's self-reported progress snapshot, built on demand when the
/// dispatcher asks for a status report. `fraction_done` is in `[0, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskStatus {
    pub fraction_done: f64,
    pub iteration: u64,
    pub total_iterations: u64,
    pub acceptance_ratio: f64,
    pub message: String,
}

impl TaskStatus {
    pub fn human_report(&self) -> String {
        format!(
            "iteration {}/{} ({:.1}%), acceptance ratio = {:.3}{}",
            self.iteration,
            self.total_iterations,
            100.0 * self.fraction_done,
            self.acceptance_ratio,
            if self.message.is_empty() {
                String::new()
            } else {
                format!(" -- {}", self.message)
            }
        )
    }
}
