use std::cell::RefCell;
use std::rc::Rc;

use mhrw_util::MovingAverageBuffer;

use crate::controllers::{AdjustmentStrategy, Controller, HasStepSize};
use crate::stats::RawMoveEvent;

/// Middle-third-of-recommended-range defaults for the target acceptance
/// band, per the usual Metropolis tuning heuristic.
pub const DEFAULT_R_LO: f64 = 0.20;
pub const DEFAULT_R_HI: f64 = 0.40;

/// Fraction of the *original* thermalization length that must still run,
/// uninterrupted, after the last step-size adjustment before
/// thermalization is allowed to end.
pub const DEFAULT_PHI: f64 = 0.5;

/// Tunables for [`StepSizeAdjuster`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepSizeAdjusterParams {
    pub r_lo: f64,
    pub r_hi: f64,
    pub phi: f64,
}

impl Default for StepSizeAdjusterParams {
    fn default() -> Self {
        Self {
            r_lo: DEFAULT_R_LO,
            r_hi: DEFAULT_R_HI,
            phi: DEFAULT_PHI,
        }
    }
}

/// Acceptance-ratio-driven step-size controller. Reads a moving average of
/// accept/reject outcomes (shared with a
/// [`crate::stats::MovingAverageAcceptanceRatioCollector`] so both see
/// exactly the same window) and nudges the walker's step size towards a
/// target band, keeping `n_sweep * step_size` constant and vetoing the end
/// of thermalization until its guarantee is satisfied.
pub struct StepSizeAdjuster {
    buffer: Rc<RefCell<MovingAverageBuffer<bool>>>,
    r_lo: f64,
    r_hi: f64,
    phi: f64,
    n_sweep: u64,
    n_therm_original: u64,
    iter_count: u64,
    last_adjustment_iter: u64,
}

impl StepSizeAdjuster {
    pub fn new(
        buffer: Rc<RefCell<MovingAverageBuffer<bool>>>,
        n_sweep: u64,
        n_therm_original: u64,
    ) -> Self {
        Self::with_params(buffer, n_sweep, n_therm_original, StepSizeAdjusterParams::default())
    }

    pub fn with_params(
        buffer: Rc<RefCell<MovingAverageBuffer<bool>>>,
        n_sweep: u64,
        n_therm_original: u64,
        params: StepSizeAdjusterParams,
    ) -> Self {
        Self {
            buffer,
            r_lo: params.r_lo,
            r_hi: params.r_hi,
            phi: params.phi,
            n_sweep,
            n_therm_original,
            iter_count: 0,
            last_adjustment_iter: 0,
        }
    }

    pub fn with_band(mut self, r_lo: f64, r_hi: f64) -> Self {
        self.r_lo = r_lo;
        self.r_hi = r_hi;
        self
    }

    pub fn with_phi(mut self, phi: f64) -> Self {
        self.phi = phi;
        self
    }

    pub fn n_sweep(&self) -> u64 {
        self.n_sweep
    }

    /// How many raw moves must elapse between two factor re-evaluations:
    /// `max(n_sweep, buffer capacity)`, so the same window of moves is
    /// never read twice into two separate adjustments.
    fn check_interval(&self) -> u64 {
        self.n_sweep.max(self.buffer.borrow().capacity() as u64).max(1)
    }

    fn factor(&self, r: f64) -> Option<f64> {
        if r >= 2.0 * self.r_hi {
            Some(1.5)
        } else if r >= 1.3 * self.r_hi {
            Some(1.2)
        } else if r >= self.r_hi {
            Some(1.05)
        } else if r <= 0.5 * self.r_lo {
            Some(0.5)
        } else if r <= 0.75 * self.r_lo {
            Some(0.8)
        } else if r < self.r_lo {
            Some(0.95)
        } else {
            None
        }
    }

    /// Minimum `n_therm` that satisfies the phi-fraction guarantee given
    /// the last adjustment happened at `last_adjustment_iter` (in raw
    /// move count), per sweep size `n_sweep`.
    fn required_n_therm(&self) -> u64 {
        let min_sweeps_remaining = self.last_adjustment_iter / self.n_sweep.max(1) + 1;
        let phi_floor = (self.phi * self.n_therm_original as f64).ceil() as u64;
        min_sweeps_remaining + phi_floor
    }
}

impl<P, WP: HasStepSize> Controller<P, WP> for StepSizeAdjuster {
    fn adjust_params(&mut self, ev: &RawMoveEvent<P>, params: &mut WP) -> AdjustmentStrategy {
        // Gate the factor re-evaluation itself to once per check interval;
        // every other qualifying move still flows through below so the
        // thermalization-extension veto stays current.
        let check_due = self.iter_count % self.check_interval() == 0;
        self.iter_count += 1;
        if !ev.is_thermalizing {
            return AdjustmentStrategy::default_allow();
        }

        let buffer = self.buffer.borrow();
        if !buffer.is_full() {
            return AdjustmentStrategy {
                allow_done_thermalization: self.required_n_therm() == 0,
                ..AdjustmentStrategy::default_allow()
            };
        }
        let r = buffer.ratio();
        drop(buffer);

        if check_due {
            if let Some(f) = self.factor(r) {
                let old_step = params.step_size();
                let old_product = self.n_sweep as f64 * old_step;
                let mut new_step = old_step * f;
                new_step = new_step.clamp(0.7 * old_step, 1.5 * old_step);
                params.set_step_size(new_step);
                self.n_sweep = (old_product / new_step).round().max(1.0) as u64;
                self.last_adjustment_iter = self.iter_count;
            }
        }

        let required = self.required_n_therm();
        let current_sweep = self.iter_count / self.n_sweep.max(1);
        AdjustmentStrategy {
            allow_done_thermalization: current_sweep >= required.min(self.n_therm_original.max(required)),
            allow_done_runs: true,
            thermalization_extend_by: required.saturating_sub(current_sweep),
            run_extend_by: 0,
        }
    }
}

impl AdjustmentStrategy {
    fn default_allow() -> Self {
        AdjustmentStrategy {
            allow_done_thermalization: true,
            allow_done_runs: true,
            thermalization_extend_by: 0,
            run_extend_by: 0,
        }
    }
}
