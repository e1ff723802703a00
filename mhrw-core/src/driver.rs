use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rand::Rng;

use crate::controllers::{AdjustmentStrategy, Controller};
use crate::error::MhrwError;
use crate::params::MHRWParams;
use crate::stats::{ProcessSampleEvent, RawMoveEvent, StatsCollector};
use crate::walker::{MHWalker, TargetConvention};

/// What a run produced, independent of the collector pipeline: collector
/// results are read back by the caller from the concrete collectors it
/// still owns, since the driver only ever sees them as trait objects.
#[derive(Debug, Clone, PartialEq)]
pub struct RunResult<WP> {
    pub mhrw_params: MHRWParams<WP>,
    pub acceptance_ratio: f64,
}

/// Runs one complete Metropolis-Hastings walk: thermalization, then live
/// sampling, honoring controller veto/extension requests on both phase
/// boundaries and polling `interrupt` at least once per iteration.
///
/// `stats` and `controllers` are invoked in the fixed order they were
/// composed into the chain the caller built; this function is agnostic of
/// what's inside that chain.
pub fn run<W>(
    walker: &mut W,
    stats: &mut dyn StatsCollector<W::Point>,
    controllers: &mut dyn Controller<W::Point, W::Params>,
    mut params: MHRWParams<W::Params>,
    rng: &mut dyn rand::RngCore,
    interrupt: Option<Arc<AtomicBool>>,
) -> Result<(RunResult<W::Params>, W::Point), MhrwError>
where
    W: MHWalker,
{
    let is_interrupted = || {
        interrupt
            .as_ref()
            .map(|f| f.load(Ordering::Relaxed))
            .unwrap_or(false)
    };

    walker.init();
    stats.init();
    controllers.init(&mut params.mhwalker_params);

    let mut cur_point = walker.init_point(&params.mhwalker_params, rng);

    let mut n_therm = params.n_therm;
    let mut therm_sweep = 0u64;

    'thermalize: loop {
        while therm_sweep < n_therm {
            for iter_in_sweep in 0..params.n_sweep {
                if is_interrupted() {
                    return Err(MhrwError::TaskInterrupted);
                }
                let (new_point, accepted, alpha) =
                    metropolis_step(walker, &cur_point, &params.mhwalker_params, rng);

                let ev = RawMoveEvent {
                    cur_point: &cur_point,
                    new_point: &new_point,
                    accepted,
                    alpha,
                    is_thermalizing: true,
                    is_live_iter: false,
                    sweep_index: therm_sweep,
                    iter_in_sweep,
                };
                stats.raw_move(&ev);
                let verdict = controllers.adjust_params(&ev, &mut params.mhwalker_params);
                if accepted {
                    cur_point = new_point;
                }

                if verdict.thermalization_extend_by > 0 {
                    n_therm = n_therm.max(therm_sweep + 1 + verdict.thermalization_extend_by);
                }
            }
            therm_sweep += 1;
        }

        // All thermalization sweeps ran; ask once more whether every
        // controller is satisfied now that we're at the boundary.
        let final_check = controllers.adjust_params(
            &RawMoveEvent {
                cur_point: &cur_point,
                new_point: &cur_point,
                accepted: false,
                alpha: 0.0,
                is_thermalizing: true,
                is_live_iter: false,
                sweep_index: therm_sweep,
                iter_in_sweep: 0,
            },
            &mut params.mhwalker_params,
        );
        if final_check.allow_done_thermalization {
            break 'thermalize;
        }
        n_therm = n_therm.max(therm_sweep + final_check.thermalization_extend_by.max(1));
    }

    walker.thermalizing_done();
    stats.thermalizing_done();

    let mut n_run = params.n_run;
    let mut live_sweep = 0u64;
    let mut accepted_count: u64 = 0;
    let mut live_iters_count: u64 = 0;

    'live: loop {
        while live_sweep < n_run {
            for iter_in_sweep in 0..params.n_sweep {
                if is_interrupted() {
                    return Err(MhrwError::TaskInterrupted);
                }
                let (new_point, accepted, alpha) =
                    metropolis_step(walker, &cur_point, &params.mhwalker_params, rng);

                let ev = RawMoveEvent {
                    cur_point: &cur_point,
                    new_point: &new_point,
                    accepted,
                    alpha,
                    is_thermalizing: false,
                    is_live_iter: iter_in_sweep == params.n_sweep - 1,
                    sweep_index: live_sweep,
                    iter_in_sweep,
                };
                stats.raw_move(&ev);
                let _verdict: AdjustmentStrategy =
                    controllers.adjust_params(&ev, &mut params.mhwalker_params);
                if accepted {
                    cur_point = new_point;
                    accepted_count += 1;
                }
                live_iters_count += 1;
            }
            live_sweep += 1;
            stats.process_sample(&ProcessSampleEvent {
                point: &cur_point,
                sample_index: live_sweep - 1,
            });
        }

        let final_check = controllers.adjust_params(
            &RawMoveEvent {
                cur_point: &cur_point,
                new_point: &cur_point,
                accepted: false,
                alpha: 0.0,
                is_thermalizing: false,
                is_live_iter: true,
                sweep_index: live_sweep,
                iter_in_sweep: 0,
            },
            &mut params.mhwalker_params,
        );
        if final_check.allow_done_runs {
            break 'live;
        }
        n_run = n_run.max(live_sweep + final_check.run_extend_by.max(1));
    }

    walker.done();
    stats.done();
    controllers.done();

    let acceptance_ratio = if live_iters_count > 0 {
        accepted_count as f64 / live_iters_count as f64
    } else {
        f64::NAN
    };

    params.n_therm = n_therm;
    params.n_run = n_run;

    Ok((
        RunResult {
            mhrw_params: params,
            acceptance_ratio,
        },
        cur_point,
    ))
}

fn metropolis_step<W: MHWalker>(
    walker: &mut W,
    cur_point: &W::Point,
    params: &W::Params,
    rng: &mut dyn rand::RngCore,
) -> (W::Point, bool, f64) {
    let new_point = walker.jump_fn(cur_point, params, rng);
    let alpha = match walker.convention() {
        TargetConvention::FnValue => {
            let cur_v = walker.fnval(cur_point);
            let new_v = walker.fnval(&new_point);
            if cur_v <= 0.0 {
                if new_v > 0.0 {
                    1.0
                } else {
                    0.0
                }
            } else {
                (new_v / cur_v).min(1.0)
            }
        }
        TargetConvention::FnLogValue => {
            let cur_lv = walker.fnlogval(cur_point);
            let new_lv = walker.fnlogval(&new_point);
            (new_lv - cur_lv).exp().min(1.0)
        }
        TargetConvention::FnRelativeValue => walker.fnrelval(&new_point, cur_point).min(1.0),
    };
    let accept = rng.gen_range(0.0..1.0) < alpha;
    (new_point, accept, alpha)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controllers::Controller;
    use crate::stats::{ProcessSampleEvent, StatsCollector};
    use crate::walker::MHWalker;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    struct TinyWalker;
    impl MHWalker for TinyWalker {
        type Point = f64;
        type Params = ();

        fn convention(&self) -> TargetConvention {
            TargetConvention::FnLogValue
        }

        fn init_point(&mut self, _params: &(), _rng: &mut dyn rand::RngCore) -> f64 {
            0.0
        }

        fn jump_fn(&mut self, cur_point: &f64, _params: &(), rng: &mut dyn rand::RngCore) -> f64 {
            cur_point + rng.gen_range(-0.5..0.5)
        }

        fn fnlogval(&mut self, point: &f64) -> f64 {
            -0.5 * point * point
        }
    }

    struct NullController;
    impl Controller<f64, ()> for NullController {}

    #[derive(Default)]
    struct SampleCounter {
        samples: Vec<f64>,
    }
    impl StatsCollector<f64> for SampleCounter {
        fn process_sample(&mut self, ev: &ProcessSampleEvent<f64>) {
            self.samples.push(*ev.point);
        }
    }

    #[test]
    fn runs_full_walk_and_samples_every_live_sweep() {
        let mut walker = TinyWalker;
        let mut stats = SampleCounter::default();
        let mut controllers = NullController;
        let params = MHRWParams::new((), 4, 10, 25).unwrap();
        let mut rng = StdRng::seed_from_u64(7);

        let (result, _final_point) =
            run(&mut walker, &mut stats, &mut controllers, params, &mut rng, None).unwrap();

        assert_eq!(stats.samples.len(), 25);
        assert_eq!(result.mhrw_params.n_therm, 10);
        assert_eq!(result.mhrw_params.n_run, 25);
        assert!(result.acceptance_ratio >= 0.0 && result.acceptance_ratio <= 1.0);
    }

    #[test]
    fn interruption_is_observed_before_any_sample() {
        let mut walker = TinyWalker;
        let mut stats = SampleCounter::default();
        let mut controllers = NullController;
        let params = MHRWParams::new((), 4, 10, 25).unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        let interrupt = Arc::new(AtomicBool::new(true));

        let result = run(
            &mut walker,
            &mut stats,
            &mut controllers,
            params,
            &mut rng,
            Some(interrupt),
        );
        assert!(matches!(result, Err(MhrwError::TaskInterrupted)));
        assert!(stats.samples.is_empty());
    }

    /// A controller that extends thermalisation exactly once, on the very
    /// first iteration, then allows everything. Final `n_therm` on the
    /// returned `RunResult` must reflect the extension.
    struct ExtendThermalizationOnce {
        extended: bool,
    }
    impl Controller<f64, ()> for ExtendThermalizationOnce {
        fn adjust_params(&mut self, ev: &RawMoveEvent<f64>, _params: &mut ()) -> AdjustmentStrategy {
            let thermalization_extend_by = if !self.extended
                && ev.is_thermalizing
                && ev.sweep_index == 0
                && ev.iter_in_sweep == 0
            {
                self.extended = true;
                5
            } else {
                0
            };
            AdjustmentStrategy {
                allow_done_thermalization: true,
                allow_done_runs: true,
                thermalization_extend_by,
                run_extend_by: 0,
            }
        }
    }

    #[test]
    fn thermalization_extension_is_reflected_in_final_params() {
        let mut walker = TinyWalker;
        let mut stats = SampleCounter::default();
        let mut controllers = ExtendThermalizationOnce { extended: false };
        let params = MHRWParams::new((), 2, 3, 4).unwrap();
        let mut rng = StdRng::seed_from_u64(11);

        let (result, _final_point) =
            run(&mut walker, &mut stats, &mut controllers, params, &mut rng, None).unwrap();

        assert_eq!(result.mhrw_params.n_therm, 6);
        assert_eq!(result.mhrw_params.n_run, 4);
    }
}
