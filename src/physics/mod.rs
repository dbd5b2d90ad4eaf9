pub mod aerodynamics;
pub mod atmosphere;
pub mod constants;
pub mod gravity;

pub use aerodynamics::{drag_coefficient, ConstantCd, DragCoefficient, MachTable};
