pub mod presets;
pub mod stage;

pub use stage::{DragLaw, Stage, StageBuilder};
