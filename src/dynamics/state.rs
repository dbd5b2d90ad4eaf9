use nalgebra::Vector6;

// ---------------------------------------------------------------------------
// 3DOF trajectory-frame state
// ---------------------------------------------------------------------------

pub const DOWNRANGE: usize = 0;
pub const CROSSRANGE: usize = 1;
pub const ALTITUDE: usize = 2;
pub const VELOCITY: usize = 3;
pub const FLIGHT_PATH_ANGLE: usize = 4;
pub const HEADING: usize = 5;

/// `[downrange, crossrange, altitude, velocity, flight_path_angle, heading]`
///
/// Lengths in m, speed in m/s, angles in rad. Heading is measured clockwise
/// from the nominal downrange axis, so crossrange lies 90° to its right.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct State(pub Vector6<f64>);

impl State {
    pub fn new(
        downrange: f64,
        crossrange: f64,
        altitude: f64,
        velocity: f64,
        flight_path_angle: f64,
        heading: f64,
    ) -> Self {
        Self(Vector6::new(
            downrange,
            crossrange,
            altitude,
            velocity,
            flight_path_angle,
            heading,
        ))
    }

    pub fn downrange(&self) -> f64 {
        self.0[DOWNRANGE]
    }

    pub fn crossrange(&self) -> f64 {
        self.0[CROSSRANGE]
    }

    pub fn altitude(&self) -> f64 {
        self.0[ALTITUDE]
    }

    pub fn velocity(&self) -> f64 {
        self.0[VELOCITY]
    }

    pub fn flight_path_angle(&self) -> f64 {
        self.0[FLIGHT_PATH_ANGLE]
    }

    pub fn heading(&self) -> f64 {
        self.0[HEADING]
    }

    /// Advance state by a derivative scaled by dt (used inside RK4).
    pub fn apply(&self, d: &Deriv, dt: f64) -> State {
        State(self.0 + d.0 * dt)
    }

    pub fn is_finite(&self) -> bool {
        self.0.iter().all(|x| x.is_finite())
    }

    pub fn to_array(&self) -> [f64; 6] {
        [
            self.0[DOWNRANGE],
            self.0[CROSSRANGE],
            self.0[ALTITUDE],
            self.0[VELOCITY],
            self.0[FLIGHT_PATH_ANGLE],
            self.0[HEADING],
        ]
    }
}

/// Time derivative of [`State`], same component layout.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Deriv(pub Vector6<f64>);

impl Deriv {
    pub fn zeros() -> Self {
        Self(Vector6::zeros())
    }
}
