use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};
use crate::monte_carlo::perturbation::Perturbation;

/// Mass fraction used for fragment indices beyond the configured list.
pub const FALLBACK_MASS_FRACTION: f64 = 0.05;

fn default_time_step() -> f64 {
    0.5
}

fn default_max_time() -> f64 {
    500.0
}

fn default_fragment_max_time() -> f64 {
    300.0
}

fn default_fallback_fraction() -> f64 {
    FALLBACK_MASS_FRACTION
}

fn unit() -> Perturbation {
    Perturbation::constant(1.0)
}

fn calm() -> Perturbation {
    Perturbation::constant(0.0)
}

// ---------------------------------------------------------------------------
// Named stochastic inputs of one trial
// ---------------------------------------------------------------------------

/// Every stochastic input of a trial, by name.
///
/// Angles are in degrees, altitude in m, speeds in m/s, mass in kg.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Perturbations {
    pub altitude: Perturbation,
    pub velocity: Perturbation,
    pub flight_path_angle: Perturbation,
    pub azimuth: Perturbation,
    #[serde(default = "unit")]
    pub density_factor: Perturbation,
    #[serde(default = "calm")]
    pub wind_along: Perturbation,
    #[serde(default = "calm")]
    pub wind_cross: Perturbation,
    pub mass: Perturbation,
    #[serde(default = "unit")]
    pub drag_scale: Perturbation,
}

impl Perturbations {
    /// Zero-variance inputs at the given separation conditions, calm air.
    pub fn fixed(
        altitude: f64,
        velocity: f64,
        flight_path_angle_deg: f64,
        azimuth_deg: f64,
        mass: f64,
    ) -> Self {
        Self {
            altitude: Perturbation::constant(altitude),
            velocity: Perturbation::constant(velocity),
            flight_path_angle: Perturbation::constant(flight_path_angle_deg),
            azimuth: Perturbation::constant(azimuth_deg),
            density_factor: unit(),
            wind_along: calm(),
            wind_cross: calm(),
            mass: Perturbation::constant(mass),
            drag_scale: unit(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &Perturbation)> + '_ {
        [
            ("altitude", &self.altitude),
            ("velocity", &self.velocity),
            ("flight_path_angle", &self.flight_path_angle),
            ("azimuth", &self.azimuth),
            ("density_factor", &self.density_factor),
            ("wind_along", &self.wind_along),
            ("wind_cross", &self.wind_cross),
            ("mass", &self.mass),
            ("drag_scale", &self.drag_scale),
        ]
        .into_iter()
    }

    /// Look up a perturbation by its config-file name.
    pub fn get(&self, name: &str) -> Option<&Perturbation> {
        self.iter().find(|(n, _)| *n == name).map(|(_, p)| p)
    }

    /// Copy with every input collapsed to its expected value.
    pub fn deterministic(&self) -> Self {
        Self {
            altitude: self.altitude.deterministic(),
            velocity: self.velocity.deterministic(),
            flight_path_angle: self.flight_path_angle.deterministic(),
            azimuth: self.azimuth.deterministic(),
            density_factor: self.density_factor.deterministic(),
            wind_along: self.wind_along.deterministic(),
            wind_cross: self.wind_cross.deterministic(),
            mass: self.mass.deterministic(),
            drag_scale: self.drag_scale.deterministic(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        for (_, p) in self.iter() {
            p.validate()?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Breakup model
// ---------------------------------------------------------------------------

/// In-flight breakup of the primary body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FragmentationParams {
    /// Chance per trial that a breakup happens at all.
    pub breakup_probability: f64,
    /// Altitude window (m) in which breakup may occur, inclusive.
    pub altitude_min: f64,
    pub altitude_max: f64,
    /// Number of fragments; draws are rounded and floored at 2.
    pub fragment_count: Perturbation,
    /// Separation delta-V (m/s), floored at 0.
    pub delta_v: Perturbation,
    /// Spread angle (deg).
    pub spread_angle: Perturbation,
    /// Mass fraction of the stage carried by fragment `i`.
    pub mass_fractions: Vec<f64>,
    #[serde(default = "default_fallback_fraction")]
    pub fallback_mass_fraction: f64,
}

impl FragmentationParams {
    pub fn mass_fraction(&self, index: usize) -> f64 {
        self.mass_fractions
            .get(index)
            .copied()
            .unwrap_or(self.fallback_mass_fraction)
    }

    pub fn contains_altitude(&self, altitude: f64) -> bool {
        (self.altitude_min..=self.altitude_max).contains(&altitude)
    }

    pub fn deterministic(&self) -> Self {
        Self {
            fragment_count: self.fragment_count.deterministic(),
            delta_v: self.delta_v.deterministic(),
            spread_angle: self.spread_angle.deterministic(),
            ..self.clone()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.breakup_probability) {
            return Err(SimError::InvalidConfig(format!(
                "breakup probability {} outside [0, 1]",
                self.breakup_probability
            )));
        }
        if !(self.altitude_min <= self.altitude_max) {
            return Err(SimError::InvalidConfig(format!(
                "breakup window [{}, {}] is inverted",
                self.altitude_min, self.altitude_max
            )));
        }
        let fractions = self
            .mass_fractions
            .iter()
            .chain(std::iter::once(&self.fallback_mass_fraction));
        for &f in fractions {
            if !(f > 0.0 && f <= 1.0) {
                return Err(SimError::InvalidConfig(format!(
                    "fragment mass fraction {} outside (0, 1]",
                    f
                )));
            }
        }
        self.fragment_count.validate()?;
        self.delta_v.validate()?;
        self.spread_angle.validate()
    }
}

// ---------------------------------------------------------------------------
// Monte Carlo run configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub iterations: usize,
    pub seed: u64,
    /// End of the primary propagation span, s.
    #[serde(default = "default_max_time")]
    pub max_time: f64,
    /// Fixed RK4 step, s.
    #[serde(default = "default_time_step")]
    pub time_step: f64,
    /// Length of each fragment's propagation span, s.
    #[serde(default = "default_fragment_max_time")]
    pub fragment_max_time: f64,
    /// Azimuth (deg) of the downrange axis. Heading = sampled azimuth - this.
    pub nominal_azimuth_deg: f64,
    pub perturbations: Perturbations,
    #[serde(default)]
    pub fragmentation: Option<FragmentationParams>,
}

impl SimulationConfig {
    pub fn new(iterations: usize, seed: u64, nominal_azimuth_deg: f64, perturbations: Perturbations) -> Self {
        Self {
            iterations,
            seed,
            max_time: default_max_time(),
            time_step: default_time_step(),
            fragment_max_time: default_fragment_max_time(),
            nominal_azimuth_deg,
            perturbations,
            fragmentation: None,
        }
    }

    pub fn with_fragmentation(self, fragmentation: FragmentationParams) -> Self {
        Self {
            fragmentation: Some(fragmentation),
            ..self
        }
    }

    pub fn with_iterations(self, iterations: usize) -> Self {
        Self { iterations, ..self }
    }

    pub fn with_seed(self, seed: u64) -> Self {
        Self { seed, ..self }
    }

    /// Preview copy: every perturbation at its expected value.
    pub fn deterministic(&self) -> Self {
        Self {
            perturbations: self.perturbations.deterministic(),
            fragmentation: self.fragmentation.as_ref().map(|f| f.deterministic()),
            ..self.clone()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.iterations == 0 {
            return Err(SimError::InvalidConfig("iterations must be > 0".into()));
        }
        if !(self.time_step > 0.0) || !self.time_step.is_finite() {
            return Err(SimError::InvalidStep(self.time_step));
        }
        if !(self.max_time > 0.0) {
            return Err(SimError::InvalidTimeSpan { start: 0.0, stop: self.max_time });
        }
        if !(self.fragment_max_time > 0.0) {
            return Err(SimError::InvalidConfig(format!(
                "fragment_max_time {} must be > 0",
                self.fragment_max_time
            )));
        }
        if !self.nominal_azimuth_deg.is_finite() {
            return Err(SimError::InvalidConfig("nominal azimuth must be finite".into()));
        }
        self.perturbations.validate()?;
        if let Some(frag) = &self.fragmentation {
            frag.validate()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn breakup() -> FragmentationParams {
        FragmentationParams {
            breakup_probability: 0.3,
            altitude_min: 10_000.0,
            altitude_max: 30_000.0,
            fragment_count: Perturbation::normal(3.0, 1.0).unwrap(),
            delta_v: Perturbation::normal(50.0, 20.0).unwrap(),
            spread_angle: Perturbation::normal(0.0, 10.0).unwrap(),
            mass_fractions: vec![0.4, 0.3, 0.2],
            fallback_mass_fraction: FALLBACK_MASS_FRACTION,
        }
    }

    fn config() -> SimulationConfig {
        SimulationConfig::new(10, 1, 45.0, Perturbations::fixed(43_000.0, 1738.0, 25.0, 45.0, 30_600.0))
    }

    #[test]
    fn mass_fraction_falls_back() {
        let f = breakup();
        assert_eq!(f.mass_fraction(0), 0.4);
        assert_eq!(f.mass_fraction(2), 0.2);
        assert_eq!(f.mass_fraction(3), 0.05);
        assert_eq!(f.mass_fraction(50), 0.05);
    }

    #[test]
    fn window_is_inclusive() {
        let f = breakup();
        assert!(f.contains_altitude(10_000.0));
        assert!(f.contains_altitude(30_000.0));
        assert!(!f.contains_altitude(30_000.1));
    }

    #[test]
    fn validation_catches_bad_values() {
        assert!(config().validate().is_ok());
        assert!(config().with_iterations(0).validate().is_err());

        let mut c = config();
        c.time_step = 0.0;
        assert!(matches!(c.validate(), Err(SimError::InvalidStep(_))));

        let mut f = breakup();
        f.breakup_probability = 1.5;
        assert!(config().with_fragmentation(f).validate().is_err());

        let mut f = breakup();
        f.altitude_min = 40_000.0;
        assert!(config().with_fragmentation(f).validate().is_err());

        let mut f = breakup();
        f.mass_fractions = vec![0.5, 0.0];
        assert!(config().with_fragmentation(f).validate().is_err());
    }

    #[test]
    fn deterministic_returns_new_config() {
        let mut c = config().with_fragmentation(breakup());
        c.perturbations.velocity = Perturbation::normal(1738.0, 20.0).unwrap();
        let preview = c.deterministic();
        assert_eq!(preview.perturbations.velocity, Perturbation::constant(1738.0));
        assert_eq!(
            preview.fragmentation.as_ref().unwrap().delta_v,
            Perturbation::constant(50.0)
        );
        // source config unchanged
        assert_eq!(c.perturbations.velocity, Perturbation::normal(1738.0, 20.0).unwrap());
    }

    #[test]
    fn lookup_by_name() {
        let p = Perturbations::fixed(43_000.0, 1738.0, 25.0, 45.0, 30_600.0);
        assert_eq!(p.get("velocity"), Some(&Perturbation::constant(1738.0)));
        assert_eq!(p.get("drag_scale"), Some(&Perturbation::constant(1.0)));
        assert!(p.get("thrust").is_none());
    }

    #[test]
    fn yaml_defaults_fill_optional_fields() {
        let yaml = r#"
iterations: 5
seed: 7
nominal_azimuth_deg: 45.0
perturbations:
  altitude: { distribution: normal, params: [43000.0, 500.0] }
  velocity: { distribution: normal, params: [1738.0, 20.0] }
  flight_path_angle: { distribution: normal, params: [25.0, 0.5] }
  azimuth: { distribution: uniform, params: [44.0, 46.0] }
  mass: { distribution: normal, params: [30600.0, 300.0] }
"#;
        let c: SimulationConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(c.time_step, 0.5);
        assert_eq!(c.fragment_max_time, 300.0);
        assert!(c.fragmentation.is_none());
        assert_eq!(c.perturbations.density_factor, Perturbation::constant(1.0));
        assert!(c.validate().is_ok());
    }
}
