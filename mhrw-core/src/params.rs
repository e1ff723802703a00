use crate::error::MhrwError;

/// Tunable parameters for one MHRW run. `n_sweep` Metropolis iterations
/// make up a sweep; `n_therm` sweeps thermalize the walk before `n_run`
/// live sweeps are sampled.
#[derive(Debug, Clone, PartialEq)]
pub struct MHRWParams<WP> {
    pub mhwalker_params: WP,
    pub n_sweep: u64,
    pub n_therm: u64,
    pub n_run: u64,
}

impl<WP> MHRWParams<WP> {
    pub fn new(mhwalker_params: WP, n_sweep: u64, n_therm: u64, n_run: u64) -> Result<Self, MhrwError> {
        if n_sweep == 0 {
            return Err(MhrwError::InvalidParameters(
                "n_sweep must be positive".to_string(),
            ));
        }
        Ok(Self {
            mhwalker_params,
            n_sweep,
            n_therm,
            n_run,
        })
    }

    pub fn total_iterations(&self) -> u64 {
        (self.n_therm + self.n_run) * self.n_sweep
    }
}
