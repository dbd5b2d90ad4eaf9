use std::fmt;
use std::str::FromStr;

use rand::Rng;
use rand_distr::{Distribution, Normal, Poisson};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};

// ---------------------------------------------------------------------------
// Distribution kinds
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistributionKind {
    Normal,
    Uniform,
    Poisson,
}

impl DistributionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DistributionKind::Normal => "normal",
            DistributionKind::Uniform => "uniform",
            DistributionKind::Poisson => "poisson",
        }
    }
}

impl fmt::Display for DistributionKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DistributionKind {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "normal" | "gaussian" => Ok(DistributionKind::Normal),
            "uniform" => Ok(DistributionKind::Uniform),
            "poisson" => Ok(DistributionKind::Poisson),
            _ => Err(SimError::UnknownDistribution(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Perturbation: one stochastic input
// ---------------------------------------------------------------------------

/// A random input described by its distribution and parameters.
///
/// A `Perturbation` is a plain value. Overrides such as [`deterministic`]
/// return a new value and leave the original untouched.
///
/// [`deterministic`]: Perturbation::deterministic
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawPerturbation", into = "RawPerturbation")]
pub enum Perturbation {
    Normal { mean: f64, std: f64 },
    Uniform { low: f64, high: f64 },
    Poisson { lambda: f64 },
}

impl Perturbation {
    pub fn normal(mean: f64, std: f64) -> Result<Self> {
        Self::Normal { mean, std }.validated()
    }

    pub fn uniform(low: f64, high: f64) -> Result<Self> {
        Self::Uniform { low, high }.validated()
    }

    pub fn poisson(lambda: f64) -> Result<Self> {
        Self::Poisson { lambda }.validated()
    }

    /// Fixed value, expressed as a zero-width normal.
    pub fn constant(value: f64) -> Self {
        Self::Normal { mean: value, std: 0.0 }
    }

    /// Build from a kind name and a parameter tuple, as found in config files.
    pub fn from_parts(kind: &str, params: &[f64]) -> Result<Self> {
        let kind: DistributionKind = kind.parse()?;
        let p = match (kind, params) {
            (DistributionKind::Normal, &[mean, std]) => Self::Normal { mean, std },
            (DistributionKind::Uniform, &[low, high]) => Self::Uniform { low, high },
            (DistributionKind::Poisson, &[lambda]) => Self::Poisson { lambda },
            (kind, _) => {
                return Err(SimError::InvalidPerturbation {
                    kind: kind.as_str(),
                    params: params.to_vec(),
                    reason: format!("expected {} parameter(s)", kind_arity(kind)),
                })
            }
        };
        p.validated()
    }

    pub fn kind(&self) -> DistributionKind {
        match self {
            Self::Normal { .. } => DistributionKind::Normal,
            Self::Uniform { .. } => DistributionKind::Uniform,
            Self::Poisson { .. } => DistributionKind::Poisson,
        }
    }

    pub fn params(&self) -> Vec<f64> {
        match *self {
            Self::Normal { mean, std } => vec![mean, std],
            Self::Uniform { low, high } => vec![low, high],
            Self::Poisson { lambda } => vec![lambda],
        }
    }

    /// Expected value.
    pub fn mean(&self) -> f64 {
        match *self {
            Self::Normal { mean, .. } => mean,
            Self::Uniform { low, high } => 0.5 * (low + high),
            Self::Poisson { lambda } => lambda,
        }
    }

    /// Zero-variance copy centered on the expected value.
    pub fn deterministic(&self) -> Self {
        Self::constant(self.mean())
    }

    /// Copy with a different mean, keeping the spread.
    pub fn with_mean(&self, mean: f64) -> Self {
        match *self {
            Self::Normal { std, .. } => Self::Normal { mean, std },
            Self::Uniform { low, high } => {
                let half = 0.5 * (high - low);
                Self::Uniform { low: mean - half, high: mean + half }
            }
            Self::Poisson { .. } => Self::Poisson { lambda: mean },
        }
    }

    pub fn validate(&self) -> Result<()> {
        let bad = |reason: &str| {
            Err(SimError::InvalidPerturbation {
                kind: self.kind().as_str(),
                params: self.params(),
                reason: reason.to_string(),
            })
        };
        if self.params().iter().any(|p| !p.is_finite()) {
            return bad("parameters must be finite");
        }
        match *self {
            Self::Normal { std, .. } if std < 0.0 => bad("standard deviation must be >= 0"),
            Self::Uniform { low, high } if low > high => bad("low must not exceed high"),
            Self::Poisson { lambda } if lambda <= 0.0 => bad("lambda must be > 0"),
            _ => Ok(()),
        }
    }

    fn validated(self) -> Result<Self> {
        self.validate()?;
        Ok(self)
    }

    /// Draw one value.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<f64> {
        self.validate()?;
        let value = match *self {
            Self::Normal { mean, std } => {
                let dist = Normal::new(mean, std).map_err(|e| self.sampling_error(e))?;
                dist.sample(rng)
            }
            Self::Uniform { low, high } => rng.gen_range(low..=high),
            Self::Poisson { lambda } => {
                let dist = Poisson::new(lambda).map_err(|e| self.sampling_error(e))?;
                dist.sample(rng)
            }
        };
        Ok(value)
    }

    fn sampling_error(&self, e: impl fmt::Display) -> SimError {
        SimError::InvalidPerturbation {
            kind: self.kind().as_str(),
            params: self.params(),
            reason: e.to_string(),
        }
    }
}

fn kind_arity(kind: DistributionKind) -> usize {
    match kind {
        DistributionKind::Normal | DistributionKind::Uniform => 2,
        DistributionKind::Poisson => 1,
    }
}

// ---------------------------------------------------------------------------
// Config-file representation: { distribution: normal, params: [mean, std] }
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawPerturbation {
    distribution: String,
    params: Vec<f64>,
}

impl TryFrom<RawPerturbation> for Perturbation {
    type Error = SimError;

    fn try_from(raw: RawPerturbation) -> Result<Self> {
        Perturbation::from_parts(&raw.distribution, &raw.params)
    }
}

impl From<Perturbation> for RawPerturbation {
    fn from(p: Perturbation) -> Self {
        RawPerturbation {
            distribution: p.kind().as_str().to_string(),
            params: p.params(),
        }
    }
}
