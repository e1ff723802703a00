use crate::error::{HistogramError, OutOfRange};
use crate::params::HistogramParams;

/// Common read access shared by [`Histogram`] and [`HistogramWithErrorBars`],
/// used by [`crate::averaged::AveragedHistogram`] so it can aggregate either
/// shape without duplicating bookkeeping.
pub trait HistogramLike {
    /// Whether this shape carries its own per-bin error bars, known at the
    /// type level rather than inferred from whatever values happen to be
    /// accumulated. `Histogram` is bare counts (`false`);
    /// `HistogramWithErrorBars` always has them (`true`).
    const HAS_ERROR_BARS: bool;

    fn params(&self) -> &HistogramParams;
    fn bins(&self) -> &[f64];
    fn off_chart(&self) -> f64;
    /// `Some(delta)` if this histogram already carries error bars.
    fn delta(&self) -> Option<&[f64]>;
}

/// A uniform-bin counting histogram. Counts are stored as `f64` so that
/// weighted recording (`record_weighted`) and integral recording
/// (`record`, weight 1.0) share one representation.
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    params: HistogramParams,
    bins: Vec<f64>,
    off_chart: f64,
}

impl Histogram {
    pub fn new(params: HistogramParams) -> Self {
        Self {
            bins: vec![0.0; params.num_bins],
            params,
            off_chart: 0.0,
        }
    }

    pub fn record(&mut self, value: f64) -> Result<usize, OutOfRange> {
        self.record_weighted(value, 1.0)
    }

    pub fn record_weighted(&mut self, value: f64, weight: f64) -> Result<usize, OutOfRange> {
        debug_assert!(weight >= 0.0, "weight must be non-negative");
        match self.params.bin_index(value) {
            Ok(k) => {
                self.bins[k] += weight;
                Ok(k)
            }
            Err(e) => {
                self.off_chart += weight;
                Err(e)
            }
        }
    }

    pub fn add(&mut self, other: &Histogram) -> Result<(), HistogramError> {
        if self.params != other.params {
            return Err(HistogramError::MismatchedParams);
        }
        for (a, b) in self.bins.iter_mut().zip(other.bins.iter()) {
            *a += b;
        }
        self.off_chart += other.off_chart;
        Ok(())
    }

    pub fn reset(&mut self) {
        self.bins.iter_mut().for_each(|b| *b = 0.0);
        self.off_chart = 0.0;
    }

    /// Total of all recorded weight, on-chart or off.
    pub fn total_count(&self) -> f64 {
        self.bins.iter().sum::<f64>() + self.off_chart
    }

    pub(crate) fn set_bin_direct(&mut self, k: usize, value: f64) {
        self.bins[k] = value;
    }

    pub(crate) fn set_off_chart_direct(&mut self, value: f64) {
        self.off_chart = value;
    }

    /// The same histogram rescaled so `bins.sum() + off_chart == 1`.
    /// Returns a histogram of all zeros if nothing was ever recorded.
    pub fn normalized(&self) -> Histogram {
        let total = self.total_count();
        if total == 0.0 {
            return self.clone();
        }
        Histogram {
            params: self.params,
            bins: self.bins.iter().map(|b| b / total).collect(),
            off_chart: self.off_chart / total,
        }
    }
}

impl HistogramLike for Histogram {
    const HAS_ERROR_BARS: bool = false;

    fn params(&self) -> &HistogramParams {
        &self.params
    }
    fn bins(&self) -> &[f64] {
        &self.bins
    }
    fn off_chart(&self) -> f64 {
        self.off_chart
    }
    fn delta(&self) -> Option<&[f64]> {
        None
    }
}

/// A [`Histogram`] plus a per-bin error estimate.
#[derive(Debug, Clone, PartialEq)]
pub struct HistogramWithErrorBars {
    pub histogram: Histogram,
    pub delta: Vec<f64>,
}

impl HistogramWithErrorBars {
    pub fn new(histogram: Histogram, delta: Vec<f64>) -> Self {
        debug_assert_eq!(histogram.bins.len(), delta.len());
        debug_assert!(delta.iter().all(|d| *d >= 0.0));
        Self { histogram, delta }
    }
}

impl HistogramLike for HistogramWithErrorBars {
    const HAS_ERROR_BARS: bool = true;

    fn params(&self) -> &HistogramParams {
        self.histogram.params()
    }
    fn bins(&self) -> &[f64] {
        self.histogram.bins()
    }
    fn off_chart(&self) -> f64 {
        self.histogram.off_chart()
    }
    fn delta(&self) -> Option<&[f64]> {
        Some(&self.delta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> HistogramParams {
        HistogramParams::new(0.0, 1.0, 10).unwrap()
    }

    #[test]
    fn record_buckets_in_range_values_and_counts_out_of_range_as_off_chart() {
        let mut h = Histogram::new(params());
        for v in [0.05, 0.15, 0.25, 0.35, 1.0, -0.1, f64::NAN] {
            let _ = h.record(v);
        }
        assert_eq!(
            h.bins,
            vec![1.0, 1.0, 1.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]
        );
        assert_eq!(h.off_chart, 3.0);
    }

    #[test]
    fn add_requires_matching_params() {
        let mut a = Histogram::new(params());
        let b = Histogram::new(HistogramParams::new(0.0, 2.0, 10).unwrap());
        assert_eq!(a.add(&b), Err(HistogramError::MismatchedParams));
    }

    #[test]
    fn normalized_sums_to_one() {
        let mut h = Histogram::new(params());
        h.record(0.05).unwrap();
        h.record(0.15).unwrap();
        let _ = h.record(5.0); // off-chart
        let n = h.normalized();
        let total: f64 = n.bins.iter().sum::<f64>() + n.off_chart;
        assert!((total - 1.0).abs() < 1e-12);
    }
}
