use std::fmt;
use std::ops::ControlFlow;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{info, warn};

use crate::dynamics::Dynamics;
use crate::error::{Result, SimError};
use crate::monte_carlo::config::SimulationConfig;
use crate::monte_carlo::driver::{run_trial, TrialOutcome, Trials};
use crate::sim::ImpactRecord;

// ---------------------------------------------------------------------------
// Progress reporting and cooperative cancellation
// ---------------------------------------------------------------------------

/// Trials finished out of the total requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
}

impl Progress {
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            self.completed as f64 / self.total as f64
        }
    }
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}/{} trials ({:.0}%)",
            self.completed,
            self.total,
            self.fraction() * 100.0
        )
    }
}

/// What the batch runner does when a trial's primary propagation fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Record the failure and continue with the next trial.
    #[default]
    Skip,
    /// Stop and return the error.
    Abort,
}

#[derive(Debug)]
pub struct TrialFailure {
    pub trial: usize,
    pub error: SimError,
}

/// Result of a batch run.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub records: Vec<ImpactRecord>,
    pub failures: Vec<TrialFailure>,
    pub trials_completed: usize,
    pub dropped_fragments: usize,
    pub cancelled: bool,
}

impl BatchReport {
    pub fn primaries(&self) -> impl Iterator<Item = &ImpactRecord> {
        self.records.iter().filter(|r| !r.is_fragment())
    }

    pub fn fragments(&self) -> impl Iterator<Item = &ImpactRecord> {
        self.records.iter().filter(|r| r.is_fragment())
    }
}

/// Run a whole Monte Carlo batch, reporting progress after every trial.
///
/// `on_progress` may return `ControlFlow::Break(())` to stop before the next
/// trial starts; a trial already running always finishes.
pub fn run_batch<M, F>(
    model: &M,
    config: &SimulationConfig,
    policy: FailurePolicy,
    mut on_progress: F,
) -> Result<BatchReport>
where
    M: Dynamics + ?Sized,
    F: FnMut(Progress) -> ControlFlow<()>,
{
    let trials = Trials::new(model, config)?;
    let total = trials.total();
    let mut report = BatchReport::default();

    for outcome in trials {
        let trial = report.trials_completed;
        match outcome {
            Ok(outcome) => {
                report.dropped_fragments += outcome.dropped_fragments;
                report.records.extend(outcome.records);
            }
            Err(error) => match policy {
                FailurePolicy::Abort => return Err(error),
                FailurePolicy::Skip => {
                    warn!(trial, error = %error, "trial failed, skipping");
                    report.failures.push(TrialFailure { trial, error });
                }
            },
        }
        report.trials_completed += 1;

        let progress = Progress {
            completed: report.trials_completed,
            total,
        };
        if on_progress(progress).is_break() {
            if report.trials_completed < total {
                info!(%progress, "Monte Carlo run cancelled");
                report.cancelled = true;
            }
            break;
        }
    }

    Ok(report)
}

// ---------------------------------------------------------------------------
// Batch-parallel variant
// ---------------------------------------------------------------------------

/// Seed for one trial's generator (splitmix64 of run seed and trial index).
pub fn trial_seed(seed: u64, trial: usize) -> u64 {
    let mut z = seed ^ (trial as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15);
    z = z.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

fn independent_trial<M: Dynamics + ?Sized>(
    model: &M,
    config: &SimulationConfig,
    trial: usize,
) -> Result<TrialOutcome> {
    let mut rng = StdRng::seed_from_u64(trial_seed(config.seed, trial));
    run_trial(model, config, trial, &mut rng)
}

/// Run all trials with one generator per trial, in parallel when the
/// `parallel` feature is on.
///
/// Same RK4 trial routine as [`MonteCarlo`], but each trial draws from its
/// own stream, so results match the sequential driver statistically rather
/// than bit for bit. Output is in trial order and does not depend on the
/// number of worker threads.
pub fn run_independent_trials<M>(
    model: &M,
    config: &SimulationConfig,
) -> Result<Vec<Result<TrialOutcome>>>
where
    M: Dynamics + Sync + ?Sized,
{
    config.validate()?;
    info!(iterations = config.iterations, seed = config.seed, "starting batch-parallel run");

    #[cfg(feature = "parallel")]
    let outcomes = {
        use rayon::prelude::*;
        (0..config.iterations)
            .into_par_iter()
            .map(|trial| independent_trial(model, config, trial))
            .collect()
    };

    #[cfg(not(feature = "parallel"))]
    let outcomes = (0..config.iterations)
        .map(|trial| independent_trial(model, config, trial))
        .collect();

    Ok(outcomes)
}

/// Flattened records of [`run_independent_trials`], failing on the first error.
pub fn collect_impacts_parallel<M>(model: &M, config: &SimulationConfig) -> Result<Vec<ImpactRecord>>
where
    M: Dynamics + Sync + ?Sized,
{
    let mut records = Vec::with_capacity(config.iterations);
    for outcome in run_independent_trials(model, config)? {
        records.extend(outcome?.records);
    }
    Ok(records)
}
