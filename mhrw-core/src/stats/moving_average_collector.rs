use std::cell::RefCell;
use std::rc::Rc;

use mhrw_util::MovingAverageBuffer;

use crate::stats::{ProcessSampleEvent, RawMoveEvent, StatsCollector};

/// Tracks the acceptance ratio over the last `window` proposed moves. The
/// buffer is shared (via `Rc<RefCell<_>>`, never across threads: each task
/// owns one walk) with a [`crate::controllers::StepSizeAdjuster`] so the
/// controller can read the same ratio the collector is reporting, without
/// either one re-deriving it independently.
pub struct MovingAverageAcceptanceRatioCollector {
    buffer: Rc<RefCell<MovingAverageBuffer<bool>>>,
}

impl MovingAverageAcceptanceRatioCollector {
    pub fn new(window: usize) -> Self {
        Self {
            buffer: Rc::new(RefCell::new(MovingAverageBuffer::new(window))),
        }
    }

    /// A handle controllers can read from, sharing this collector's buffer.
    pub fn buffer_handle(&self) -> Rc<RefCell<MovingAverageBuffer<bool>>> {
        Rc::clone(&self.buffer)
    }

    /// `NaN` until at least one move has been observed.
    pub fn acceptance_ratio(&self) -> f64 {
        self.buffer.borrow().ratio()
    }
}

impl<P> StatsCollector<P> for MovingAverageAcceptanceRatioCollector {
    fn raw_move(&mut self, ev: &RawMoveEvent<P>) {
        self.buffer.borrow_mut().push(ev.accepted);
    }

    fn process_sample(&mut self, _ev: &ProcessSampleEvent<P>) {}
}
