pub mod batch;
pub mod config;
pub mod driver;
pub mod perturbation;

pub use batch::{
    collect_impacts_parallel, run_batch, run_independent_trials, BatchReport, FailurePolicy,
    Progress, TrialFailure,
};
pub use config::{FragmentationParams, Perturbations, SimulationConfig, FALLBACK_MASS_FRACTION};
pub use driver::{
    collect_impacts, fragment_initial_state, run_trial, BreakupEvent, MonteCarlo, TrialOutcome,
    Trials,
};
pub use perturbation::{DistributionKind, Perturbation};
