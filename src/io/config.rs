use std::fs::File;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_yaml::from_reader;
use tracing::info;

use crate::error::{Result, SimError};
use crate::geo::LaunchSite;
use crate::monte_carlo::{FragmentationParams, Perturbation, Perturbations, SimulationConfig};
use crate::vehicle::{presets, Stage};

// ---------------------------------------------------------------------------
// Scenario file: launch site + falling stage + Monte Carlo setup
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    pub launch: LaunchSite,
    pub stage: Stage,
    pub simulation: SimulationConfig,
}

impl Scenario {
    /// Heavy first stage separating at 43 km over the steppe, with a 30%
    /// breakup chance between 10 and 30 km. Breakups mostly shed two
    /// fragments, so a 50-trial run averages about 30 fragment records.
    pub fn reference() -> Self {
        let normal = |mean, std| Perturbation::Normal { mean, std };
        let perturbations = Perturbations {
            altitude: normal(43_000.0, 500.0),
            velocity: normal(1738.0, 20.0),
            flight_path_angle: normal(25.0, 0.5),
            azimuth: normal(45.0, 0.5),
            density_factor: normal(1.0, 0.05),
            wind_along: normal(0.0, 10.0),
            wind_cross: normal(0.0, 10.0),
            mass: normal(30_600.0, 300.0),
            drag_scale: normal(1.0, 0.05),
        };
        let fragmentation = FragmentationParams {
            breakup_probability: 0.3,
            altitude_min: 10_000.0,
            altitude_max: 30_000.0,
            fragment_count: normal(2.0, 0.3),
            delta_v: normal(50.0, 20.0),
            spread_angle: normal(0.0, 10.0),
            mass_fractions: vec![0.4, 0.3, 0.2, 0.1],
            fallback_mass_fraction: crate::monte_carlo::FALLBACK_MASS_FRACTION,
        };

        Self {
            name: "reference".into(),
            launch: LaunchSite {
                latitude_deg: 45.72341,
                longitude_deg: 63.32275,
                azimuth_deg: 45.0,
            },
            stage: presets::heavy_first_stage(),
            simulation: SimulationConfig::new(50, 42, 45.0, perturbations)
                .with_fragmentation(fragmentation),
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.stage.validate()?;
        self.simulation.validate()?;
        let site = [
            self.launch.latitude_deg,
            self.launch.longitude_deg,
            self.launch.azimuth_deg,
        ];
        if site.iter().any(|v| !v.is_finite()) || self.launch.latitude_deg.abs() > 90.0 {
            return Err(SimError::InvalidConfig(format!(
                "launch site {:?} is not a valid position",
                self.launch
            )));
        }
        if (self.launch.azimuth_deg - self.simulation.nominal_azimuth_deg).abs() > 1e-9 {
            return Err(SimError::InvalidConfig(format!(
                "launch azimuth {}° differs from the nominal azimuth {}° of the downrange axis",
                self.launch.azimuth_deg, self.simulation.nominal_azimuth_deg
            )));
        }
        Ok(())
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}

/// Read and validate a YAML scenario file.
pub fn load_scenario(path: impl AsRef<Path>) -> Result<Scenario> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let scenario: Scenario = from_reader(file)?;
    scenario.validate()?;
    info!(
        path = %path.display(),
        name = %scenario.name,
        iterations = scenario.simulation.iterations,
        "loaded scenario"
    );
    Ok(scenario)
}
