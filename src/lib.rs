//! Monte Carlo impact dispersion for spent stages falling back through the
//! atmosphere.
//!
//! A 3DOF point-mass model ([`dynamics`]) is propagated with fixed-step RK4
//! ([`sim`]) from perturbed separation conditions ([`monte_carlo`]), with an
//! optional in-flight breakup into fragments. Impact points are projected
//! onto the globe ([`geo`]) and summarized by a confidence ellipse
//! ([`dispersion`]).

pub mod dispersion;
pub mod dynamics;
pub mod error;
pub mod geo;
pub mod io;
pub mod monte_carlo;
pub mod physics;
pub mod sim;
pub mod vehicle;

pub use dispersion::{compute_dispersion_ellipse, Ellipse};
pub use dynamics::{BallisticModel, Dynamics, ModelParams, State};
pub use error::{Result, SimError};
pub use geo::{latlon_to_meters, meters_to_latlon, GeoPoint, LaunchSite};
pub use monte_carlo::{collect_impacts, MonteCarlo, Perturbation, SimulationConfig};
pub use sim::{propagate, ImpactRecord, TimeSpan, TrajectoryResult};
