use mhrw_histogram::{Histogram, HistogramParams};

use crate::stats::{ProcessSampleEvent, RawMoveEvent, StatsCollector};
use crate::value_calculator::ValueCalculator;

/// Bins the value calculator's output for every sample taken during the
/// live phase. This is the plain collector; pair it with
/// [`super::ValueHistogramWithBinningCollector`] when an error bar on the
/// histogram itself is also wanted.
pub struct ValueHistogramCollector<P> {
    calculator: Box<dyn ValueCalculator<P>>,
    histogram: Histogram,
}

impl<P> ValueHistogramCollector<P> {
    pub fn new(params: HistogramParams, calculator: Box<dyn ValueCalculator<P>>) -> Self {
        Self {
            calculator,
            histogram: Histogram::new(params),
        }
    }

    pub fn histogram(&self) -> &Histogram {
        &self.histogram
    }

    pub fn into_histogram(self) -> Histogram {
        self.histogram
    }
}

impl<P> StatsCollector<P> for ValueHistogramCollector<P> {
    fn raw_move(&mut self, _ev: &RawMoveEvent<P>) {}

    fn process_sample(&mut self, ev: &ProcessSampleEvent<P>) {
        let value = self.calculator.get_value(ev.point);
        let _ = self.histogram.record(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mhrw_histogram::{HistogramLike, HistogramParams};

    struct Identity;
    impl ValueCalculator<f64> for Identity {
        fn get_value(&self, point: &f64) -> f64 {
            *point
        }
    }

    #[test]
    fn bins_every_sample() {
        let params = HistogramParams::new(0.0, 1.0, 2).unwrap();
        let mut collector = ValueHistogramCollector::new(params, Box::new(Identity));
        for v in [0.1, 0.1, 0.6] {
            collector.process_sample(&ProcessSampleEvent {
                point: &v,
                sample_index: 0,
            });
        }
        assert_eq!(collector.histogram().bins(), &[2.0, 1.0]);
    }
}
