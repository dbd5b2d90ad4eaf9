use crate::physics::constants::{EARTH_RADIUS, G0};

/// Inverse-square gravity magnitude at a given altitude (m/s^2).
/// Negative altitudes are clamped to sea level.
pub fn gravity_accel(altitude: f64) -> f64 {
    let alt = altitude.max(0.0);
    G0 * (EARTH_RADIUS / (EARTH_RADIUS + alt)).powi(2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sea_level_gravity() {
        assert!((gravity_accel(0.0) - G0).abs() < 1e-12);
    }

    #[test]
    fn gravity_decreases_with_altitude() {
        let g0 = gravity_accel(0.0);
        let g100k = gravity_accel(100_000.0);
        assert!(g100k < g0);
        // ~3% weaker at 100 km
        assert!((g100k / g0 - 0.969).abs() < 0.001);
    }
}
