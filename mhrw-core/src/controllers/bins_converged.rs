use mhrw_histogram::{BinningAnalysisResult, ConvergenceStatus};

use crate::controllers::{AdjustmentStrategy, Controller};
use crate::stats::RawMoveEvent;

/// Tunables for [`BinsConvergedController`]'s veto policy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BinsConvergedControllerParams {
    /// Veto if more than this many tracked bins have unknown convergence.
    pub max_unknown: u64,
    /// Veto if more than this many unknown bins sit next to a not-converged
    /// bin (an "isolated" unknown bin, with only converged neighbors, is
    /// tolerated up to `max_unknown`, but one bordering known bad data
    /// isn't).
    pub max_unknown_isolated: u64,
    /// Veto if more than this many bins are outright not converged.
    pub max_not_converged: u64,
}

impl Default for BinsConvergedControllerParams {
    fn default() -> Self {
        Self {
            max_unknown: 2,
            max_unknown_isolated: 0,
            max_not_converged: 0,
        }
    }
}

/// Extends the live sampling phase until a shared binning analysis reports
/// the tracked quantities have converged within `params`' tolerances, up to
/// a hard cap on extensions so a pathological walk can't run forever. Reads
/// the same [`mhrw_histogram::BinningAnalysis`] a
/// [`crate::stats::ValueHistogramWithBinningCollector`] is feeding;
/// finalizing it is destructive, so this controller only asks for a
/// verdict at sweep boundaries via a caller-supplied closure rather than
/// owning the analysis itself.
pub struct BinsConvergedController<F> {
    check: F,
    max_extensions: u64,
    extensions_used: u64,
    sweeps_per_extension: u64,
    params: BinsConvergedControllerParams,
}

impl<F> BinsConvergedController<F>
where
    F: FnMut() -> Option<BinningAnalysisResult>,
{
    pub fn new(check: F, sweeps_per_extension: u64, max_extensions: u64) -> Self {
        Self::with_params(
            check,
            sweeps_per_extension,
            max_extensions,
            BinsConvergedControllerParams::default(),
        )
    }

    pub fn with_params(
        check: F,
        sweeps_per_extension: u64,
        max_extensions: u64,
        params: BinsConvergedControllerParams,
    ) -> Self {
        Self {
            check,
            max_extensions,
            extensions_used: 0,
            sweeps_per_extension,
            params,
        }
    }

    /// Vetoes completion if too many bins are unknown, too many of those
    /// unknowns border a not-converged bin, or too many bins are outright
    /// not converged.
    fn vetoes(&self, result: &BinningAnalysisResult) -> bool {
        vetoes_for(result.verdicts(), &self.params)
    }
}

/// Pure policy decision over a convergence-verdict table, kept separate
/// from [`BinningAnalysisResult`] so it's testable without driving real
/// samples through a binning analysis.
fn vetoes_for(verdicts: &[ConvergenceStatus], params: &BinsConvergedControllerParams) -> bool {
    let bins_unknown = verdicts
        .iter()
        .filter(|v| matches!(v, ConvergenceStatus::UnknownConvergence))
        .count() as u64;
    let bins_not_converged = verdicts
        .iter()
        .filter(|v| matches!(v, ConvergenceStatus::NotConverged))
        .count() as u64;
    let bins_unknown_and_adjacent_to_not_converged = verdicts
        .iter()
        .enumerate()
        .filter(|(_, v)| matches!(v, ConvergenceStatus::UnknownConvergence))
        .filter(|(i, _)| {
            let left = *i > 0 && matches!(verdicts[i - 1], ConvergenceStatus::NotConverged);
            let right =
                i + 1 < verdicts.len() && matches!(verdicts[i + 1], ConvergenceStatus::NotConverged);
            left || right
        })
        .count() as u64;

    bins_unknown > params.max_unknown
        || bins_unknown_and_adjacent_to_not_converged > params.max_unknown_isolated
        || bins_not_converged > params.max_not_converged
}

impl<P, WP, F> Controller<P, WP> for BinsConvergedController<F>
where
    F: FnMut() -> Option<BinningAnalysisResult>,
{
    fn adjust_params(&mut self, ev: &RawMoveEvent<P>, _params: &mut WP) -> AdjustmentStrategy {
        if ev.is_thermalizing || !ev.is_live_iter {
            return AdjustmentStrategy {
                allow_done_thermalization: true,
                allow_done_runs: true,
                thermalization_extend_by: 0,
                run_extend_by: 0,
            };
        }

        if self.extensions_used >= self.max_extensions {
            return AdjustmentStrategy {
                allow_done_thermalization: true,
                allow_done_runs: true,
                thermalization_extend_by: 0,
                run_extend_by: 0,
            };
        }

        let vetoed = match (self.check)() {
            Some(result) => self.vetoes(&result),
            None => false,
        };

        if !vetoed {
            AdjustmentStrategy {
                allow_done_thermalization: true,
                allow_done_runs: true,
                thermalization_extend_by: 0,
                run_extend_by: 0,
            }
        } else {
            self.extensions_used += 1;
            AdjustmentStrategy {
                allow_done_thermalization: true,
                allow_done_runs: false,
                thermalization_extend_by: 0,
                run_extend_by: self.sweeps_per_extension,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mhrw_histogram::{BinningAnalysis, BinningAnalysisParams};

    fn converged_result() -> BinningAnalysisResult {
        let params = BinningAnalysisParams::new(1, 8).unwrap();
        let mut ba = BinningAnalysis::new(params);
        for i in 0..4096 {
            ba.add_sample(&[if i % 2 == 0 { 1.0 } else { -1.0 }]);
        }
        ba.finalize()
    }

    fn not_converged_result() -> BinningAnalysisResult {
        let params = BinningAnalysisParams::new(1, 8).unwrap();
        let mut ba = BinningAnalysis::new(params);
        let n = 4096usize;
        for i in 0..n {
            ba.add_sample(&[(i as f64 / n as f64 * std::f64::consts::PI).sin()]);
        }
        ba.finalize()
    }

    #[test]
    fn extends_run_until_converged_then_stops() {
        let mut calls = 0;
        let mut controller = BinsConvergedController::new(
            move || {
                calls += 1;
                Some(if calls < 3 {
                    not_converged_result()
                } else {
                    converged_result()
                })
            },
            10,
            5,
        );
        let mut params = ();
        let mut last = AdjustmentStrategy {
            allow_done_thermalization: true,
            allow_done_runs: true,
            thermalization_extend_by: 0,
            run_extend_by: 0,
        };
        for call in 0..3 {
            let ev = RawMoveEvent {
                cur_point: &0.0_f64,
                new_point: &0.0_f64,
                accepted: true,
                alpha: 1.0,
                is_thermalizing: false,
                is_live_iter: true,
                sweep_index: call,
                iter_in_sweep: 3,
            };
            last = Controller::<f64, ()>::adjust_params(&mut controller, &ev, &mut params);
        }
        assert!(last.allow_done_runs);
    }

    #[test]
    fn caps_extensions_at_max() {
        let mut controller = BinsConvergedController::new(|| Some(not_converged_result()), 10, 2);
        let mut params = ();
        let mut last_run_extend = 0;
        for call in 0..5 {
            let ev = RawMoveEvent {
                cur_point: &0.0_f64,
                new_point: &0.0_f64,
                accepted: true,
                alpha: 1.0,
                is_thermalizing: false,
                is_live_iter: true,
                sweep_index: call,
                iter_in_sweep: 3,
            };
            let verdict = Controller::<f64, ()>::adjust_params(&mut controller, &ev, &mut params);
            last_run_extend = verdict.run_extend_by;
        }
        assert_eq!(last_run_extend, 0);
    }

    use ConvergenceStatus::{Converged, NotConverged, UnknownConvergence};

    #[test]
    fn tolerates_isolated_unknowns_within_default_budget() {
        let verdicts = [Converged, Converged, UnknownConvergence, Converged, Converged];
        assert!(!vetoes_for(&verdicts, &BinsConvergedControllerParams::default()));
    }

    #[test]
    fn vetoes_when_unknown_count_exceeds_budget() {
        let verdicts = [
            Converged,
            UnknownConvergence,
            UnknownConvergence,
            UnknownConvergence,
            Converged,
        ];
        assert!(vetoes_for(&verdicts, &BinsConvergedControllerParams::default()));
    }

    #[test]
    fn vetoes_on_a_single_not_converged_bin_by_default() {
        let verdicts = [Converged, Converged, NotConverged, Converged];
        assert!(vetoes_for(&verdicts, &BinsConvergedControllerParams::default()));
    }

    #[test]
    fn vetoes_when_an_unknown_bin_borders_a_not_converged_bin() {
        let verdicts = [Converged, NotConverged, UnknownConvergence, Converged];
        let params = BinsConvergedControllerParams {
            max_unknown: 5,
            max_unknown_isolated: 0,
            max_not_converged: 5,
        };
        assert!(vetoes_for(&verdicts, &params));
    }
}
