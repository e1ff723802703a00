use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "mhrw-1d-gauss")]
#[command(author = "Philippe Faist")]
#[command(version = "1.0.0")]
pub struct Args {
    #[arg(short, long)]
    pub log_file: Option<PathBuf>,

    /// Number of independent random-walk tasks to run.
    #[arg(long, default_value_t = 4)]
    pub num_tasks: usize,

    /// Worker threads to spread tasks across; clamped to hardware
    /// concurrency.
    #[arg(long, default_value_t = 4)]
    pub num_workers: usize,

    #[arg(long, default_value_t = 42)]
    pub base_seed: u64,

    #[arg(long, default_value_t = 50)]
    pub n_therm: u64,

    #[arg(long, default_value_t = 2000)]
    pub n_run: u64,

    #[arg(long, default_value_t = 10)]
    pub n_sweep: u64,

    #[arg(long, default_value_t = 1.0)]
    pub step_size: f64,
}
