// ---------------------------------------------------------------------------
// Preset stages
// ---------------------------------------------------------------------------

use super::stage::{DragLaw, Stage, StageBuilder};

/// Spent heavy first stage: 30.6 t dry, 43 m^2 reference area, blunt-body
/// Mach-dependent drag.
pub fn heavy_first_stage() -> Stage {
    StageBuilder::new("Heavy-S1")
        .dry_mass(30_600.0)
        .reference_area(43.0)
        .drag(DragLaw::MachTable)
        .build()
}

/// Small jettisoned fairing half with constant drag.
pub fn fairing_half() -> Stage {
    StageBuilder::new("Fairing-Half")
        .dry_mass(1_200.0)
        .reference_area(12.0)
        .cd(1.3)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_are_valid() {
        assert!(heavy_first_stage().validate().is_ok());
        assert!(fairing_half().validate().is_ok());
    }

    #[test]
    fn fairing_is_lighter_per_area() {
        assert!(fairing_half().ballistic_coefficient(2.0) < heavy_first_stage().ballistic_coefficient(2.0));
    }
}
