use crate::histogram::HistogramLike;

/// Renders a histogram as a bar-chart, one line per bin, scaled so the
/// longest bar fits in `width` columns. Each line is
/// `[lower, upper)  count (+/- delta)  bar`.
pub fn render<H: HistogramLike>(h: &H, width: usize) -> String {
    let params = h.params();
    let bins = h.bins();
    let max = bins.iter().cloned().fold(0.0_f64, f64::max).max(1e-300);

    let mut out = String::new();
    for k in 0..params.num_bins {
        let lower = params.bin_lower_value(k);
        let upper = params.bin_upper_value(k);
        let value = bins[k];
        let bar_len = ((value / max) * width as f64).round() as usize;
        let bar: String = std::iter::repeat('#').take(bar_len).collect();

        let label = match h.delta() {
            Some(delta) => format!("{:.6} +/- {:.6}", value, delta[k]),
            None => format!("{:.6}", value),
        };

        out.push_str(&format!(
            "[{lower:>10.4}, {upper:>10.4})  {label:<24} {bar}\n"
        ));
    }
    out.push_str(&format!("off_chart: {:.6}\n", h.off_chart()));
    out
}
