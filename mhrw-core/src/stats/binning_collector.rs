use mhrw_histogram::{
    BinningAnalysis, BinningAnalysisParams, BinningAnalysisResult, Histogram, HistogramLike,
    HistogramParams, HistogramWithErrorBars,
};

use crate::stats::{ProcessSampleEvent, RawMoveEvent, StatsCollector};
use crate::value_calculator::ValueCalculator;

/// Bins the value calculator's output like [`super::ValueHistogramCollector`],
/// but also runs each bin's one-hot indicator through a binning analysis so
/// the final histogram carries a per-bin error estimate and a convergence
/// verdict rather than being a bare count.
pub struct ValueHistogramWithBinningCollector<P> {
    calculator: Box<dyn ValueCalculator<P>>,
    histogram: Histogram,
    binning: BinningAnalysis,
    indicator: Vec<f64>,
}

impl<P> ValueHistogramWithBinningCollector<P> {
    pub fn new(
        hist_params: HistogramParams,
        num_levels: usize,
        calculator: Box<dyn ValueCalculator<P>>,
    ) -> Self {
        let num_bins = hist_params.num_bins;
        // Indicator vector carries one extra slot for "off-chart".
        let binning_params = BinningAnalysisParams::new(num_bins + 1, num_levels)
            .expect("histogram bin count and binning levels must be valid");
        Self {
            calculator,
            histogram: Histogram::new(hist_params),
            binning: BinningAnalysis::new(binning_params),
            indicator: vec![0.0; num_bins + 1],
        }
    }

    pub fn histogram(&self) -> &Histogram {
        &self.histogram
    }

    /// A non-destructive snapshot of the binning analysis so far, for
    /// controllers that need a live convergence verdict mid-run without
    /// consuming the accumulator the way [`finalize`](Self::finalize)
    /// does.
    pub fn peek_binning(&self) -> BinningAnalysisResult {
        self.binning.clone().finalize()
    }

    /// Consumes the collector and runs the accumulated binning analysis,
    /// producing the final histogram with error bars, already normalized
    /// so bins plus off-chart sum to one, and the underlying convergence
    /// verdicts. The per-bin error estimates from the binning analysis are
    /// already in that same probability space (they come from binning a
    /// 0/1 bin-membership indicator), so no rescaling is needed.
    pub fn finalize(self) -> (HistogramWithErrorBars, BinningAnalysisResult) {
        let result = self.binning.finalize();
        let num_bins = self.histogram.bins().len();
        let delta = (0..num_bins).map(|k| result.final_error(k)).collect();
        let normalized = self.histogram.normalized();
        (HistogramWithErrorBars::new(normalized, delta), result)
    }
}

impl<P> StatsCollector<P> for ValueHistogramWithBinningCollector<P> {
    fn process_sample(&mut self, ev: &ProcessSampleEvent<P>) {
        let value = self.calculator.get_value(ev.point);
        self.indicator.iter_mut().for_each(|v| *v = 0.0);
        match self.histogram.record(value) {
            Ok(k) => self.indicator[k] = 1.0,
            Err(_) => {
                let off_chart_slot = self.indicator.len() - 1;
                self.indicator[off_chart_slot] = 1.0;
            }
        }
        self.binning.add_sample(&self.indicator);
    }

    fn raw_move(&mut self, _ev: &RawMoveEvent<P>) {}
}
