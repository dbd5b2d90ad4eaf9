// ---------------------------------------------------------------------------
// Physical constants shared by the atmosphere, dynamics and geo layers
// ---------------------------------------------------------------------------

pub const G0: f64 = 9.80665; // standard gravity, m/s^2
pub const EARTH_RADIUS: f64 = 6_371_000.0; // mean Earth radius, m

pub const R_AIR: f64 = 287.05; // specific gas constant for dry air, J/(kg·K)
pub const GAMMA_AIR: f64 = 1.4; // ratio of specific heats

pub const RHO0: f64 = 1.225; // sea-level density, kg/m^3
pub const SCALE_HEIGHT: f64 = 8_500.0; // exponential scale height, m

pub const T0: f64 = 288.15; // sea-level temperature, K
pub const LAPSE_RATE: f64 = -0.0065; // troposphere lapse rate, K/m
pub const TROPOPAUSE_ALT: f64 = 11_000.0; // m

pub const MIN_SOUND_SPEED_TEMP: f64 = 100.0; // K, floor for speed of sound

pub const KM_PER_DEG: f64 = 111.0; // flattened degree length, km
