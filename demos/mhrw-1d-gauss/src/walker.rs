use mhrw_core::controllers::HasStepSize;
use mhrw_core::walker::{MHWalker, TargetConvention};
use rand::Rng;

/// Tunable parameters for [`GaussianWalker`]: a single proposal step size,
/// adjusted in place by a
/// [`mhrw_core::controllers::StepSizeAdjuster`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GaussianParams {
    pub step_size: f64,
}

impl HasStepSize for GaussianParams {
    fn step_size(&self) -> f64 {
        self.step_size
    }
    fn set_step_size(&mut self, value: f64) {
        self.step_size = value;
    }
}

/// Samples a standard normal distribution via a symmetric uniform
/// proposal. Exists to exercise the engine end-to-end on a target whose
/// true histogram is known in closed form.
pub struct GaussianWalker;

impl MHWalker for GaussianWalker {
    type Point = f64;
    type Params = GaussianParams;

    fn convention(&self) -> TargetConvention {
        TargetConvention::FnLogValue
    }

    fn init_point(&mut self, _params: &Self::Params, _rng: &mut dyn rand::RngCore) -> Self::Point {
        0.0
    }

    fn jump_fn(
        &mut self,
        cur_point: &Self::Point,
        params: &Self::Params,
        rng: &mut dyn rand::RngCore,
    ) -> Self::Point {
        cur_point + params.step_size * rng.gen_range(-1.0..1.0)
    }

    fn fnlogval(&mut self, point: &Self::Point) -> f64 {
        -0.5 * point * point
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn fnlogval_peaks_at_zero() {
        let mut walker = GaussianWalker;
        assert!(walker.fnlogval(&0.0) > walker.fnlogval(&1.0));
    }

    #[test]
    fn jump_fn_stays_within_one_step() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(7);
        let mut walker = GaussianWalker;
        let params = GaussianParams { step_size: 0.5 };
        let next = walker.jump_fn(&0.0, &params, &mut rng);
        assert!(next.abs() <= 0.5);
    }
}
