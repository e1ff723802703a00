use crate::error::HistogramError;
use crate::histogram::{Histogram, HistogramLike, HistogramWithErrorBars};
use crate::params::HistogramParams;

/// Accumulates a series of per-run histograms (with or without their own
/// error bars, depending on `H`) into a single averaged histogram with
/// error bars. Call [`add_histogram`](Self::add_histogram) for each run,
/// then [`finalize`](Self::finalize) exactly once.
///
/// Order-insensitive: the final result only depends on the multiset of
/// inputs, never on the order `add_histogram` was called in, which is what
/// lets task results be aggregated regardless of completion order.
pub struct AveragedHistogram<H: HistogramLike> {
    params: HistogramParams,
    sum_bins: Vec<f64>,
    sum_bins_sq: Vec<f64>,
    sum_delta_sq: Vec<f64>,
    sum_off_chart: f64,
    sum_off_chart_sq: f64,
    num_histograms: usize,
    finalized: bool,
    _marker: std::marker::PhantomData<H>,
}

impl<H: HistogramLike> AveragedHistogram<H> {
    pub fn new(params: HistogramParams) -> Self {
        Self {
            sum_bins: vec![0.0; params.num_bins],
            sum_bins_sq: vec![0.0; params.num_bins],
            sum_delta_sq: vec![0.0; params.num_bins],
            sum_off_chart: 0.0,
            sum_off_chart_sq: 0.0,
            num_histograms: 0,
            finalized: false,
            params,
            _marker: std::marker::PhantomData,
        }
    }

    pub fn num_histograms(&self) -> usize {
        self.num_histograms
    }

    /// # Panics
    /// Panics if called after [`finalize`](Self::finalize), or if `h`'s
    /// params don't match this accumulator's.
    pub fn add_histogram(&mut self, h: &H) -> Result<(), HistogramError> {
        assert!(
            !self.finalized,
            "AveragedHistogram::add_histogram called after finalize"
        );
        if h.params() != &self.params {
            return Err(HistogramError::MismatchedParams);
        }

        for (k, &v) in h.bins().iter().enumerate() {
            self.sum_bins[k] += v;
            self.sum_bins_sq[k] += v * v;
        }
        if let Some(delta) = h.delta() {
            for (k, &d) in delta.iter().enumerate() {
                self.sum_delta_sq[k] += d * d;
            }
        }
        self.sum_off_chart += h.off_chart();
        self.sum_off_chart_sq += h.off_chart() * h.off_chart();
        self.num_histograms += 1;

        Ok(())
    }

    /// Consumes the accumulator and produces the averaged
    /// [`HistogramWithErrorBars`]. Must be called exactly once.
    pub fn finalize(mut self) -> HistogramWithErrorBars {
        assert!(!self.finalized, "AveragedHistogram::finalize called twice");
        self.finalized = true;

        let n = self.num_histograms as f64;
        let has_error_bars = H::HAS_ERROR_BARS;

        let mut bins = Vec::with_capacity(self.params.num_bins);
        let mut delta = Vec::with_capacity(self.params.num_bins);

        for k in 0..self.params.num_bins {
            let mean = self.sum_bins[k] / n;
            bins.push(mean);

            let d = if has_error_bars {
                self.sum_delta_sq[k].sqrt() / n
            } else if self.num_histograms >= 2 {
                let variance = (self.sum_bins_sq[k] / n - mean * mean) / (n - 1.0);
                variance.max(0.0).sqrt()
            } else {
                0.0
            };
            delta.push(d);
        }

        let off_chart_mean = self.sum_off_chart / n;

        let mut histogram = Histogram::new(self.params);
        for (k, b) in bins.into_iter().enumerate() {
            // Bypass weighted recording: we already hold final bin means.
            histogram.set_bin_unchecked(k, b);
        }
        histogram.set_off_chart_unchecked(off_chart_mean);

        HistogramWithErrorBars::new(histogram, delta)
    }
}

impl Histogram {
    pub(crate) fn set_bin_unchecked(&mut self, k: usize, value: f64) {
        self.set_bin_direct(k, value);
    }

    pub(crate) fn set_off_chart_unchecked(&mut self, value: f64) {
        self.set_off_chart_direct(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::HistogramParams;

    fn params() -> HistogramParams {
        HistogramParams::new(0.0, 3.0, 3).unwrap()
    }

    fn make(bins: [f64; 3]) -> Histogram {
        let mut h = Histogram::new(params());
        for (k, v) in bins.into_iter().enumerate() {
            h.set_bin_unchecked(k, v);
        }
        h
    }

    #[test]
    fn averaging_bare_histograms_falls_back_to_sample_variance() {
        let mut avg = AveragedHistogram::<Histogram>::new(params());
        avg.add_histogram(&make([2.0, 4.0, 4.0])).unwrap();
        avg.add_histogram(&make([4.0, 4.0, 6.0])).unwrap();
        let result = avg.finalize();

        assert_eq!(result.histogram.bins(), &[3.0, 4.0, 5.0]);
        for (got, want) in result.delta.iter().zip([1.0, 0.0, 1.0]) {
            assert!((got - want).abs() < 1e-9, "{got} vs {want}");
        }
    }

    #[test]
    fn averaging_with_error_bars_combines_in_quadrature() {
        let params = HistogramParams::new(0.0, 2.0, 2).unwrap();
        let mut avg = AveragedHistogram::<HistogramWithErrorBars>::new(params);

        let h1 = HistogramWithErrorBars::new(
            {
                let mut h = Histogram::new(params);
                h.set_bin_unchecked(0, 1.0);
                h.set_bin_unchecked(1, 2.0);
                h
            },
            vec![0.3, 0.4],
        );
        let h2 = HistogramWithErrorBars::new(
            {
                let mut h = Histogram::new(params);
                h.set_bin_unchecked(0, 3.0);
                h.set_bin_unchecked(1, 4.0);
                h
            },
            vec![0.4, 0.3],
        );

        avg.add_histogram(&h1).unwrap();
        avg.add_histogram(&h2).unwrap();
        let result = avg.finalize();

        assert_eq!(result.histogram.bins(), &[2.0, 3.0]);
        let expect0 = (0.3f64.powi(2) + 0.4f64.powi(2)).sqrt() / 2.0;
        let expect1 = (0.4f64.powi(2) + 0.3f64.powi(2)).sqrt() / 2.0;
        assert!((result.delta[0] - expect0).abs() < 1e-12);
        assert!((result.delta[1] - expect1).abs() < 1e-12);
    }

    #[test]
    #[should_panic]
    fn double_finalize_panics() {
        let avg = AveragedHistogram::<Histogram>::new(params());
        let avg2 = AveragedHistogram::<Histogram> {
            finalized: true,
            ..avg
        };
        avg2.finalize();
    }
}
