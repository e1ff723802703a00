//! Controllers observe the same events stats collectors do, but are
//! allowed to mutate the walker's parameters and to veto the driver's
//! phase transitions (finishing thermalization, finishing the run).

pub mod bins_converged;
pub mod step_size;

pub use bins_converged::{BinsConvergedController, BinsConvergedControllerParams};
pub use step_size::{StepSizeAdjuster, StepSizeAdjusterParams};

use crate::stats::RawMoveEvent;

/// What a controller wants the driver to do after observing one move.
/// `thermalization_extend`/`run_extend` add that many further sweeps
/// before the corresponding "done" check is asked again; the driver takes
/// the maximum extension requested by any controller in the chain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdjustmentStrategy {
    pub allow_done_thermalization: bool,
    pub allow_done_runs: bool,
    pub thermalization_extend_by: u64,
    pub run_extend_by: u64,
}

impl AdjustmentStrategy {
    /// Permissive default a chain folds its members' verdicts into: a
    /// phase is allowed to end only if every controller allows it.
    fn unanimous() -> Self {
        Self {
            allow_done_thermalization: true,
            allow_done_runs: true,
            thermalization_extend_by: 0,
            run_extend_by: 0,
        }
    }

    fn fold(mut self, other: AdjustmentStrategy) -> Self {
        self.allow_done_thermalization &= other.allow_done_thermalization;
        self.allow_done_runs &= other.allow_done_runs;
        self.thermalization_extend_by = self.thermalization_extend_by.max(other.thermalization_extend_by);
        self.run_extend_by = self.run_extend_by.max(other.run_extend_by);
        self
    }
}

/// Trait a controller implements to adjust a walker's parameters, typed
/// on the walker's point type `P` and its parameter type `WP`.
pub trait Controller<P, WP> {
    fn init(&mut self, _params: &mut WP) {}

    /// Called after every raw move, before the accept/reject outcome is
    /// forgotten. May mutate `params` in place.
    fn adjust_params(&mut self, ev: &RawMoveEvent<P>, params: &mut WP) -> AdjustmentStrategy {
        let _ = (ev, params);
        AdjustmentStrategy::unanimous()
    }

    fn done(&mut self) {}
}

/// Forwards lifecycle calls to each controller in registration order and
/// folds their [`AdjustmentStrategy`] verdicts with logical AND on the
/// "allow" flags and max on the "extend by" counts, so any single
/// controller can veto a transition or demand a longer run.
pub struct ControllerChain<'c, P, WP> {
    controllers: Vec<&'c mut dyn Controller<P, WP>>,
}

impl<'c, P, WP> ControllerChain<'c, P, WP> {
    pub fn new(controllers: Vec<&'c mut dyn Controller<P, WP>>) -> Self {
        Self { controllers }
    }
}

impl<'c, P, WP> Controller<P, WP> for ControllerChain<'c, P, WP> {
    fn init(&mut self, params: &mut WP) {
        for c in self.controllers.iter_mut() {
            c.init(params);
        }
    }

    fn adjust_params(&mut self, ev: &RawMoveEvent<P>, params: &mut WP) -> AdjustmentStrategy {
        self.controllers
            .iter_mut()
            .fold(AdjustmentStrategy::unanimous(), |acc, c| {
                acc.fold(c.adjust_params(ev, params))
            })
    }

    fn done(&mut self) {
        for c in self.controllers.iter_mut() {
            c.done();
        }
    }
}

/// A walker parameter type implements this so generic controllers (like
/// [`StepSizeAdjuster`]) can read and write the step size without needing
/// to know the rest of the parameter struct's shape.
pub trait HasStepSize {
    fn step_size(&self) -> f64;
    fn set_step_size(&mut self, value: f64);
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Allow;
    impl<P, WP> Controller<P, WP> for Allow {}

    struct Veto;
    impl<P, WP> Controller<P, WP> for Veto {
        fn adjust_params(&mut self, _ev: &RawMoveEvent<P>, _params: &mut WP) -> AdjustmentStrategy {
            AdjustmentStrategy {
                allow_done_thermalization: false,
                allow_done_runs: true,
                thermalization_extend_by: 3,
                run_extend_by: 0,
            }
        }
    }

    #[test]
    fn chain_vetoes_if_any_member_vetoes() {
        let mut allow = Allow;
        let mut veto = Veto;
        let mut chain = ControllerChain::new(vec![&mut allow, &mut veto]);
        let mut params = 1.0_f64;
        let ev = RawMoveEvent {
            cur_point: &0.0_f64,
            new_point: &0.0_f64,
            accepted: true,
            alpha: 1.0,
            is_thermalizing: true,
            is_live_iter: false,
            sweep_index: 0,
            iter_in_sweep: 0,
        };
        let verdict = chain.adjust_params(&ev, &mut params);
        assert!(!verdict.allow_done_thermalization);
        assert!(verdict.allow_done_runs);
        assert_eq!(verdict.thermalization_extend_by, 3);
    }
}
