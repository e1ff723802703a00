use rand::RngCore;

/// Which of the three target-function conventions a [`MHWalker`]
/// implements. The driver dispatches on this at construction time and
/// stays otherwise agnostic of which convention is in play (see the
/// redesign notes: this replaces a compile-time tag with a plain runtime
/// value).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetConvention {
    /// `fnval` returns the raw (unnormalized) target probability weight.
    FnValue,
    /// `fnlogval` returns its logarithm.
    FnLogValue,
    /// `fnrelval` returns the acceptance ratio directly.
    FnRelativeValue,
}

/// Abstracts the proposal move and the target-function evaluation for one
/// walk. `Point` is opaque to the driver: only the walker ever constructs
/// or inspects one. `Params` carries the walker's tunable parameters (e.g.
/// step size) that controllers may adjust between sweeps.
pub trait MHWalker {
    type Point: Clone;
    type Params: Clone;

    fn convention(&self) -> TargetConvention;

    fn init(&mut self) {}
    fn thermalizing_done(&mut self) {}
    fn done(&mut self) {}

    /// Produces the walk's starting point.
    fn init_point(&mut self, params: &Self::Params, rng: &mut dyn RngCore) -> Self::Point;

    /// Proposes a new point from `cur_point` using `params`.
    fn jump_fn(
        &mut self,
        cur_point: &Self::Point,
        params: &Self::Params,
        rng: &mut dyn RngCore,
    ) -> Self::Point;

    /// Required when `convention() == FnValue`.
    fn fnval(&mut self, _point: &Self::Point) -> f64 {
        unimplemented!("fnval is not implemented for this walker's convention")
    }

    /// Required when `convention() == FnLogValue`.
    fn fnlogval(&mut self, _point: &Self::Point) -> f64 {
        unimplemented!("fnlogval is not implemented for this walker's convention")
    }

    /// Required when `convention() == FnRelativeValue`. Returns the
    /// acceptance ratio directly, `alpha = min(1, P(new)/P(cur))`.
    fn fnrelval(&mut self, _new_point: &Self::Point, _cur_point: &Self::Point) -> f64 {
        unimplemented!("fnrelval is not implemented for this walker's convention")
    }
}
