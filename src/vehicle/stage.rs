use serde::{Deserialize, Serialize};

use crate::dynamics::BallisticModel;
use crate::error::{Result, SimError};
use crate::physics::aerodynamics::{drag_coefficient, DragCoefficient};

// ---------------------------------------------------------------------------
// Drag law selectable from configuration
// ---------------------------------------------------------------------------

/// Drag law of a stage, as written in scenario files.
///
/// ```yaml
/// drag: mach_table
/// drag: { constant: 1.0 }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DragLaw {
    Constant(f64),
    MachTable,
}

impl Default for DragLaw {
    fn default() -> Self {
        DragLaw::Constant(1.0)
    }
}

impl DragCoefficient for DragLaw {
    fn cd(&self, mach: f64) -> f64 {
        match self {
            DragLaw::Constant(cd) => *cd,
            DragLaw::MachTable => drag_coefficient(mach),
        }
    }
}

// ---------------------------------------------------------------------------
// Stage definition (the falling body)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stage {
    pub name: String,
    pub dry_mass: f64,       // kg
    pub reference_area: f64, // m^2
    #[serde(default)]
    pub drag: DragLaw,
}

impl Stage {
    /// Ballistic coefficient m / (Cd A) at the given Mach number, kg/m^2.
    pub fn ballistic_coefficient(&self, mach: f64) -> f64 {
        self.dry_mass / (self.drag.cd(mach) * self.reference_area)
    }

    /// Equations-of-motion model for this stage.
    pub fn model(&self) -> BallisticModel<DragLaw> {
        BallisticModel::new(self.reference_area, self.dry_mass).with_drag(self.drag)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.dry_mass.is_finite() && self.dry_mass > 0.0) {
            return Err(SimError::InvalidConfig(format!(
                "stage '{}': dry_mass must be positive, got {}",
                self.name, self.dry_mass
            )));
        }
        if !(self.reference_area.is_finite() && self.reference_area > 0.0) {
            return Err(SimError::InvalidConfig(format!(
                "stage '{}': reference_area must be positive, got {}",
                self.name, self.reference_area
            )));
        }
        if let DragLaw::Constant(cd) = self.drag {
            if !(cd.is_finite() && cd >= 0.0) {
                return Err(SimError::InvalidConfig(format!(
                    "stage '{}': drag coefficient must be non-negative, got {}",
                    self.name, cd
                )));
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Stage builder
// ---------------------------------------------------------------------------

pub struct StageBuilder {
    name: String,
    dry_mass: f64,
    reference_area: f64,
    drag: DragLaw,
}

impl StageBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dry_mass: 1000.0,
            reference_area: 1.0,
            drag: DragLaw::default(),
        }
    }

    pub fn dry_mass(mut self, v: f64) -> Self { self.dry_mass = v; self }
    pub fn reference_area(mut self, v: f64) -> Self { self.reference_area = v; self }
    pub fn drag(mut self, v: DragLaw) -> Self { self.drag = v; self }
    pub fn cd(mut self, v: f64) -> Self { self.drag = DragLaw::Constant(v); self }

    pub fn build(self) -> Stage {
        Stage {
            name: self.name,
            dry_mass: self.dry_mass,
            reference_area: self.reference_area,
            drag: self.drag,
        }
    }
}
