//! Stats collectors observe a running walk without influencing it. The
//! driver calls every collector's lifecycle methods in the fixed order
//! the collectors were registered in, on every walker iteration.

pub mod binning_collector;
pub mod histogram_collector;
pub mod moving_average_collector;
pub mod status_report;

pub use binning_collector::ValueHistogramWithBinningCollector;
pub use histogram_collector::ValueHistogramCollector;
pub use moving_average_collector::MovingAverageAcceptanceRatioCollector;
pub use status_report::TaskStatus;

/// One proposed move, reported to collectors before the accept/reject
/// decision is known to have been fully processed elsewhere. `accepted`
/// tells the collector whether `new_point` became the walk's new current
/// point.
pub struct RawMoveEvent<'a, P> {
    pub cur_point: &'a P,
    pub new_point: &'a P,
    pub accepted: bool,
    pub alpha: f64,
    pub is_thermalizing: bool,
    pub is_live_iter: bool,
    pub sweep_index: u64,
    pub iter_in_sweep: u64,
}

/// Fired once per sweep during the live phase, after thermalization, with
/// the point that sweep landed on.
pub struct ProcessSampleEvent<'a, P> {
    pub point: &'a P,
    pub sample_index: u64,
}

/// Lifecycle hooks a driver invokes on every registered collector, in
/// registration order. Collectors never see each other: composing several
/// collectors is the driver's job, not a collector's.
pub trait StatsCollector<P> {
    fn init(&mut self) {}
    fn thermalizing_done(&mut self) {}
    fn done(&mut self) {}

    fn raw_move(&mut self, _ev: &RawMoveEvent<P>) {}
    fn process_sample(&mut self, _ev: &ProcessSampleEvent<P>) {}
}

/// Forwards every lifecycle call to each collector in turn, in the order
/// given. Exists so the driver can hold one trait object instead of
/// threading a whole `Vec` of them through every call site.
pub struct StatsCollectorChain<'c, P> {
    collectors: Vec<&'c mut dyn StatsCollector<P>>,
}

impl<'c, P> StatsCollectorChain<'c, P> {
    pub fn new(collectors: Vec<&'c mut dyn StatsCollector<P>>) -> Self {
        Self { collectors }
    }
}

impl<'c, P> StatsCollector<P> for StatsCollectorChain<'c, P> {
    fn init(&mut self) {
        for c in self.collectors.iter_mut() {
            c.init();
        }
    }
    fn thermalizing_done(&mut self) {
        for c in self.collectors.iter_mut() {
            c.thermalizing_done();
        }
    }
    fn done(&mut self) {
        for c in self.collectors.iter_mut() {
            c.done();
        }
    }
    fn raw_move(&mut self, ev: &RawMoveEvent<P>) {
        for c in self.collectors.iter_mut() {
            c.raw_move(ev);
        }
    }
    fn process_sample(&mut self, ev: &ProcessSampleEvent<P>) {
        for c in self.collectors.iter_mut() {
            c.process_sample(ev);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        log: Vec<&'static str>,
    }

    impl StatsCollector<f64> for Recorder {
        fn init(&mut self) {
            self.log.push("init");
        }
        fn thermalizing_done(&mut self) {
            self.log.push("thermalizing_done");
        }
        fn done(&mut self) {
            self.log.push("done");
        }
        fn raw_move(&mut self, _ev: &RawMoveEvent<f64>) {
            self.log.push("raw_move");
        }
        fn process_sample(&mut self, _ev: &ProcessSampleEvent<f64>) {
            self.log.push("process_sample");
        }
    }

    #[test]
    fn chain_forwards_in_registration_order() {
        let mut a = Recorder::default();
        let mut b = Recorder::default();
        {
            let mut chain = StatsCollectorChain::new(vec![&mut a, &mut b]);
            chain.init();
            chain.process_sample(&ProcessSampleEvent {
                point: &1.0,
                sample_index: 0,
            });
            chain.done();
        }
        assert_eq!(a.log, vec!["init", "process_sample", "done"]);
        assert_eq!(b.log, vec!["init", "process_sample", "done"]);
    }
}
