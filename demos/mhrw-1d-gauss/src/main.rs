mod args;
mod walker;

use std::error::Error;
use std::fs::File;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use args::Args;
use clap::Parser;
use log::{info, LevelFilter};
use mhrw_core::params::MHRWParams;
use mhrw_core::value_calculator::ValueCalculator;
use mhrw_core::TaskCData;
use mhrw_dispatch::{FullStatusReport, ProgressCollector, ThreadDispatcher};
use mhrw_histogram::{pretty, HistogramParams};
use simplelog::{Config, WriteLogger};
use walker::{GaussianParams, GaussianWalker};

struct Identity;
impl ValueCalculator<f64> for Identity {
    fn get_value(&self, point: &f64) -> f64 {
        *point
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = init()?;

    let hist_params = HistogramParams::new(-4.0, 4.0, 40)?;
    let walker_params = GaussianParams { step_size: args.step_size };
    let mhrw_params = MHRWParams::new(walker_params, args.n_sweep, args.n_therm, args.n_run)?;

    info!(
        "starting {} task(s) across up to {} worker(s), base_seed={}",
        args.num_tasks, args.num_workers, args.base_seed
    );

    let cdata = Arc::new(TaskCData::new(
        mhrw_params,
        args.base_seed,
        hist_params,
        8,
        || GaussianWalker,
        || Box::new(Identity) as Box<dyn ValueCalculator<f64>>,
    ));

    let dispatcher = ThreadDispatcher::new(args.num_workers);
    let on_status_report = |report: FullStatusReport| {
        info!("{}", report.human_report());
    };

    let handle = dispatcher.spawn(
        args.num_tasks,
        args.base_seed,
        hist_params,
        move |task_index, _seed, interrupt, progress| run_one_task(&cdata, task_index, interrupt, progress),
        Some(on_status_report),
    );

    let result = handle.join()?;

    println!("{}", pretty::render(&result, 60));
    Ok(())
}

fn run_one_task(
    cdata: &TaskCData<GaussianWalker>,
    task_index: usize,
    interrupt: &Arc<AtomicBool>,
    progress: &Arc<mhrw_dispatch::SharedProgress>,
) -> Result<mhrw_histogram::HistogramWithErrorBars, mhrw_core::MhrwError> {
    progress.set_total_iterations(cdata.mhrw_params.total_iterations());
    let mut progress_collector = ProgressCollector::new(Arc::clone(progress));
    let result = cdata.run_task(task_index, interrupt, Some(&mut progress_collector))?;
    Ok(result.histogram)
}

fn init() -> Result<Args, Box<dyn Error>> {
    let args = Args::parse();

    if let Some(log_file) = &args.log_file {
        WriteLogger::init(LevelFilter::Info, Config::default(), File::create(log_file)?)?;
    }

    Ok(args)
}
