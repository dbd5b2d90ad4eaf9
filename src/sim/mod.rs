pub mod integrator;
pub mod trajectory;

pub use integrator::{propagate, rk4_step, TimeSpan};
pub use trajectory::{ImpactRecord, TrajectoryResult};
