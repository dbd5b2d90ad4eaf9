use thiserror::Error;

/// Errors raised by the propagation, sampling and dispersion layers.
///
/// Configuration and input errors fail loudly. Numerical edge cases that
/// occur during normal operation are handled in place and never show up here.
#[derive(Error, Debug)]
pub enum SimError {
    #[error("invalid time span: stop ({stop}) must be greater than start ({start})")]
    InvalidTimeSpan { start: f64, stop: f64 },

    #[error("invalid integration step {0}: must be positive and finite")]
    InvalidStep(f64),

    #[error("state became non-finite at t={time:.3} s")]
    NonFiniteState { time: f64 },

    #[error("state left the model's valid domain at t={time:.3} s")]
    OutOfDomain { time: f64 },

    #[error("unknown distribution kind '{0}' (expected normal, uniform or poisson)")]
    UnknownDistribution(String),

    #[error("invalid {kind} perturbation parameters {params:?}: {reason}")]
    InvalidPerturbation {
        kind: &'static str,
        params: Vec<f64>,
        reason: String,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SimError>;
