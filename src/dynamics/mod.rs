pub mod ballistic;
pub mod state;

pub use ballistic::{BallisticModel, Dynamics, ModelParams};
pub use state::{Deriv, State};
