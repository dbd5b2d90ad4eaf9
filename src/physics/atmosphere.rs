use crate::physics::constants::{
    GAMMA_AIR, LAPSE_RATE, MIN_SOUND_SPEED_TEMP, RHO0, R_AIR, SCALE_HEIGHT, T0, TROPOPAUSE_ALT,
};

// ---------------------------------------------------------------------------
// Single-layer exponential atmosphere
// ---------------------------------------------------------------------------

/// Atmospheric properties at a given geometric altitude.
#[derive(Debug, Clone, Copy)]
pub struct Atmo {
    pub density: f64,     // kg/m^3
    pub temperature: f64, // K
    pub sound_speed: f64, // m/s
}

/// Air density, `rho0 * exp(-h / H) * density_factor`.
/// Negative altitudes are clamped to sea level.
pub fn density(altitude_m: f64, density_factor: f64) -> f64 {
    let h = altitude_m.max(0.0);
    RHO0 * (-h / SCALE_HEIGHT).exp() * density_factor
}

/// ISA troposphere temperature, held constant above the tropopause.
pub fn temperature(altitude_m: f64) -> f64 {
    let h = altitude_m.clamp(0.0, TROPOPAUSE_ALT);
    T0 + LAPSE_RATE * h
}

/// Speed of sound with the temperature floored at 100 K.
pub fn sound_speed(temperature_k: f64) -> f64 {
    (GAMMA_AIR * R_AIR * temperature_k.max(MIN_SOUND_SPEED_TEMP)).sqrt()
}

/// All atmospheric properties at once.
pub fn at(altitude_m: f64, density_factor: f64) -> Atmo {
    let temperature = temperature(altitude_m);
    Atmo {
        density: density(altitude_m, density_factor),
        temperature,
        sound_speed: sound_speed(temperature),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
