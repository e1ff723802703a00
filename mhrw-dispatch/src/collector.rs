use std::sync::Arc;

use mhrw_core::stats::{ProcessSampleEvent, RawMoveEvent, StatsCollector};

use crate::progress::SharedProgress;

/// Bridges a task's stats-collector pipeline to its [`SharedProgress`]
/// handle: forwards every raw move as it happens, so the coordinator
/// always sees live iteration counts rather than a burst published only
/// once the task finishes. Register it alongside the task's own
/// collectors in its chain.
pub struct ProgressCollector {
    progress: Arc<SharedProgress>,
}

impl ProgressCollector {
    pub fn new(progress: Arc<SharedProgress>) -> Self {
        Self { progress }
    }
}

impl<P> StatsCollector<P> for ProgressCollector {
    fn raw_move(&mut self, ev: &RawMoveEvent<P>) {
        self.progress.record_move(ev.accepted);
    }

    fn process_sample(&mut self, _ev: &ProcessSampleEvent<P>) {}
}
