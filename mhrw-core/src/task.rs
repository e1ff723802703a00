//! Per-task harness: the read-only configuration a dispatcher shares
//! across every independent walk, plus the glue that builds one task's
//! walker, collectors and controllers, runs it, and packages the result.
//! Keeping this in `mhrw-core` (rather than duplicated per demo) is what
//! lets a dispatcher stay generic over the walker being sampled.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;

use mhrw_histogram::{BinningAnalysisResult, HistogramParams, HistogramWithErrorBars};

use crate::controllers::{
    BinsConvergedController, BinsConvergedControllerParams, ControllerChain, HasStepSize,
    StepSizeAdjuster, StepSizeAdjusterParams,
};
use crate::driver::{self, RunResult};
use crate::error::MhrwError;
use crate::params::MHRWParams;
use crate::stats::{
    MovingAverageAcceptanceRatioCollector, ProcessSampleEvent, RawMoveEvent, StatsCollector,
    StatsCollectorChain, ValueHistogramWithBinningCollector,
};
use crate::value_calculator::ValueCalculator;
use crate::walker::MHWalker;

/// A completed task's packaged output: the normalized per-bin histogram
/// with error bars, the convergence verdicts the binning analysis reached,
/// and the final run metadata (resolved `n_therm`/`n_run`, acceptance
/// ratio).
pub struct TaskResult<WP> {
    pub task_index: usize,
    pub histogram: HistogramWithErrorBars,
    pub binning_result: BinningAnalysisResult,
    pub run_result: RunResult<WP>,
}

/// Shared, read-only configuration for a batch of independent MHRW tasks:
/// the initial [`MHRWParams`], the base seed each task's seed is derived
/// from, the histogram and binning-analysis shape, and the controller
/// tunables. Constructed once before any task launches and handed to every
/// task as `&TaskCData` (or `Arc<TaskCData>` across threads); per-task
/// objects (walker, collectors, controllers, RNG) are built fresh inside
/// [`run_task`](Self::run_task) and dropped at task end.
pub struct TaskCData<W: MHWalker> {
    pub mhrw_params: MHRWParams<W::Params>,
    pub base_seed: u64,
    pub hist_params: HistogramParams,
    pub binning_levels: usize,
    pub step_size_params: StepSizeAdjusterParams,
    pub bins_converged_params: Option<BinsConvergedControllerParams>,
    /// Sweeps to extend the live phase by each time the binning analysis
    /// vetoes completion. Only consulted when `bins_converged_params` is
    /// `Some`.
    pub bins_converged_extension_sweeps: u64,
    /// Hard cap on how many times the live phase may be extended for
    /// non-convergence, so a pathological walk can't run forever.
    pub bins_converged_max_extensions: u64,
    walker_factory: Box<dyn Fn() -> W + Send + Sync>,
    value_calculator_factory: Box<dyn Fn() -> Box<dyn ValueCalculator<W::Point>> + Send + Sync>,
}

impl<W> TaskCData<W>
where
    W: MHWalker,
    W::Params: HasStepSize + Clone,
{
    pub fn new(
        mhrw_params: MHRWParams<W::Params>,
        base_seed: u64,
        hist_params: HistogramParams,
        binning_levels: usize,
        walker_factory: impl Fn() -> W + Send + Sync + 'static,
        value_calculator_factory: impl Fn() -> Box<dyn ValueCalculator<W::Point>> + Send + Sync + 'static,
    ) -> Self {
        let bins_converged_extension_sweeps = mhrw_params.n_run.max(1);
        Self {
            mhrw_params,
            base_seed,
            hist_params,
            binning_levels,
            step_size_params: StepSizeAdjusterParams::default(),
            bins_converged_params: None,
            bins_converged_extension_sweeps,
            bins_converged_max_extensions: 10,
            walker_factory: Box::new(walker_factory),
            value_calculator_factory: Box::new(value_calculator_factory),
        }
    }

    pub fn with_step_size_params(mut self, params: StepSizeAdjusterParams) -> Self {
        self.step_size_params = params;
        self
    }

    /// `extension_sweeps` is how many further live sweeps to run each time
    /// the binning analysis vetoes completion.
    pub fn with_bins_converged_params(mut self, params: BinsConvergedControllerParams, extension_sweeps: u64) -> Self {
        self.bins_converged_params = Some(params);
        self.bins_converged_extension_sweeps = extension_sweeps.max(1);
        self
    }

    /// Seed for task `task_index`, per the fixed `base_seed + task_index`
    /// mapping reproducibility depends on.
    pub fn seed_for(&self, task_index: usize) -> u64 {
        self.base_seed + task_index as u64
    }

    /// Builds and runs one independent walk: a fresh walker, RNG and
    /// collector/controller set scoped to this call, sampled against this
    /// `TaskCData`'s shared parameters. `extra_collector`, when given, is
    /// appended to the stats chain last (e.g. a status-reporting collector
    /// a dispatcher wants wired in without `mhrw-core` knowing about it).
    pub fn run_task(
        &self,
        task_index: usize,
        interrupt: &Arc<AtomicBool>,
        extra_collector: Option<&mut dyn StatsCollector<W::Point>>,
    ) -> Result<TaskResult<W::Params>, MhrwError> {
        let seed = self.seed_for(task_index);
        let mut rng = StdRng::seed_from_u64(seed);
        let mut walker = (self.walker_factory)();
        let params = self.mhrw_params.clone();

        let window = (params.n_sweep * 4).max(16) as usize;
        let mut moving_avg = MovingAverageAcceptanceRatioCollector::new(window);
        let step_size_buffer = moving_avg.buffer_handle();

        let histogram_collector = Rc::new(RefCell::new(ValueHistogramWithBinningCollector::new(
            self.hist_params,
            self.binning_levels,
            (self.value_calculator_factory)(),
        )));

        let mut step_size_adjuster = StepSizeAdjuster::with_params(
            step_size_buffer,
            params.n_sweep,
            params.n_therm,
            self.step_size_params,
        );

        let run_outcome = {
            let mut shared_hist = SharedBinningCollector(Rc::clone(&histogram_collector));
            let mut stats: Vec<&mut dyn StatsCollector<W::Point>> = vec![&mut shared_hist, &mut moving_avg];
            if let Some(extra) = extra_collector {
                stats.push(extra);
            }
            let mut stats_chain = StatsCollectorChain::new(stats);

            match self.bins_converged_params {
                Some(bc_params) => {
                    let check_handle = Rc::clone(&histogram_collector);
                    let mut bins_converged = BinsConvergedController::with_params(
                        move || Some(check_handle.borrow().peek_binning()),
                        self.bins_converged_extension_sweeps,
                        self.bins_converged_max_extensions,
                        bc_params,
                    );
                    let mut controller_chain =
                        ControllerChain::new(vec![&mut step_size_adjuster, &mut bins_converged]);
                    driver::run(
                        &mut walker,
                        &mut stats_chain,
                        &mut controller_chain,
                        params,
                        &mut rng,
                        Some(Arc::clone(interrupt)),
                    )
                }
                None => {
                    let mut controller_chain = ControllerChain::new(vec![&mut step_size_adjuster]);
                    driver::run(
                        &mut walker,
                        &mut stats_chain,
                        &mut controller_chain,
                        params,
                        &mut rng,
                        Some(Arc::clone(interrupt)),
                    )
                }
            }
        }?;

        let (run_result, _final_point) = run_outcome;

        let histogram_collector = Rc::try_unwrap(histogram_collector)
            .unwrap_or_else(|_| panic!("binning collector outlived the run it was scoped to"))
            .into_inner();
        let (histogram, binning_result) = histogram_collector.finalize();

        Ok(TaskResult {
            task_index,
            histogram,
            binning_result,
            run_result,
        })
    }
}

/// Forwards to a shared, interior-mutable binning collector so it can be
/// read from a controller's own closure (to peek the convergence verdict
/// mid-run) while also sitting in the stats chain the driver calls
/// directly. The two never run concurrently; the driver calls stats and
/// controllers sequentially per move, so the `RefCell` never actually
/// contends.
struct SharedBinningCollector<P>(Rc<RefCell<ValueHistogramWithBinningCollector<P>>>);

impl<P> StatsCollector<P> for SharedBinningCollector<P> {
    fn raw_move(&mut self, ev: &RawMoveEvent<P>) {
        self.0.borrow_mut().raw_move(ev);
    }

    fn process_sample(&mut self, ev: &ProcessSampleEvent<P>) {
        self.0.borrow_mut().process_sample(ev);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::walker::TargetConvention;

    #[derive(Debug, Clone, Copy, PartialEq)]
    struct Params {
        step_size: f64,
    }
    impl HasStepSize for Params {
        fn step_size(&self) -> f64 {
            self.step_size
        }
        fn set_step_size(&mut self, value: f64) {
            self.step_size = value;
        }
    }

    struct TinyWalker;
    impl MHWalker for TinyWalker {
        type Point = f64;
        type Params = Params;

        fn convention(&self) -> TargetConvention {
            TargetConvention::FnLogValue
        }

        fn init_point(&mut self, _params: &Params, _rng: &mut dyn rand::RngCore) -> f64 {
            0.0
        }

        fn jump_fn(&mut self, cur_point: &f64, params: &Params, rng: &mut dyn rand::RngCore) -> f64 {
            use rand::Rng;
            cur_point + params.step_size * rng.gen_range(-1.0..1.0)
        }

        fn fnlogval(&mut self, point: &f64) -> f64 {
            -0.5 * point * point
        }
    }

    struct Identity;
    impl ValueCalculator<f64> for Identity {
        fn get_value(&self, point: &f64) -> f64 {
            *point
        }
    }

    fn cdata() -> TaskCData<TinyWalker> {
        let mhrw_params = MHRWParams::new(Params { step_size: 0.5 }, 5, 4, 20).unwrap();
        let hist_params = HistogramParams::new(-4.0, 4.0, 10).unwrap();
        TaskCData::new(mhrw_params, 42, hist_params, 4, || TinyWalker, || Box::new(Identity))
    }

    #[test]
    fn seed_for_task_is_base_plus_index() {
        let cdata = cdata();
        assert_eq!(cdata.seed_for(0), 42);
        assert_eq!(cdata.seed_for(3), 45);
    }

    #[test]
    fn run_task_produces_a_normalized_histogram() {
        let cdata = cdata();
        let interrupt = Arc::new(AtomicBool::new(false));
        let result = cdata.run_task(0, &interrupt, None).unwrap();

        assert_eq!(result.task_index, 0);
        use mhrw_histogram::HistogramLike;
        let total: f64 =
            result.histogram.histogram.bins().iter().sum::<f64>() + result.histogram.histogram.off_chart();
        assert!((total - 1.0).abs() < 1e-9);
        assert_eq!(result.run_result.mhrw_params.n_run, 20);
    }

    #[test]
    fn same_seed_reproduces_the_same_histogram() {
        let cdata = cdata();
        let interrupt = Arc::new(AtomicBool::new(false));
        let a = cdata.run_task(1, &interrupt, None).unwrap();
        let b = cdata.run_task(1, &interrupt, None).unwrap();
        assert_eq!(a.histogram, b.histogram);
    }

    #[test]
    fn bins_converged_controller_can_be_wired_in_without_deadlocking() {
        let cdata = cdata().with_bins_converged_params(BinsConvergedControllerParams::default(), 5);
        let interrupt = Arc::new(AtomicBool::new(false));
        let result = cdata.run_task(0, &interrupt, None).unwrap();
        assert!(result.run_result.mhrw_params.n_run >= 20);
    }

    #[derive(Default)]
    struct CountingCollector {
        samples_seen: u64,
    }
    impl StatsCollector<f64> for CountingCollector {
        fn process_sample(&mut self, _ev: &ProcessSampleEvent<f64>) {
            self.samples_seen += 1;
        }
    }

    #[test]
    fn extra_collector_observes_every_sample() {
        let cdata = cdata();
        let interrupt = Arc::new(AtomicBool::new(false));
        let mut extra = CountingCollector::default();
        let result = cdata.run_task(0, &interrupt, Some(&mut extra)).unwrap();
        assert_eq!(extra.samples_seen, result.run_result.mhrw_params.n_run);
    }
}
