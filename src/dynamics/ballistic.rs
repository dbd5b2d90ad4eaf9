use std::f64::consts::FRAC_PI_2;

use nalgebra::Vector6;
use serde::{Deserialize, Serialize};

use crate::dynamics::state::{Deriv, State};
use crate::physics::aerodynamics::{ConstantCd, DragCoefficient};
use crate::physics::{atmosphere, gravity};

/// Below this speed (m/s) the corresponding angular rates are held at zero.
const MIN_RATE_SPEED: f64 = 1.0;

// ---------------------------------------------------------------------------
// Model interface used by the integrator
// ---------------------------------------------------------------------------

/// Autonomous or time-dependent right-hand side of the equations of motion.
pub trait Dynamics {
    fn derivatives(&self, t: f64, state: &State, params: &ModelParams) -> Deriv;

    /// Whether `state` lies in the region where the model is valid.
    /// The integrator stops with an error as soon as a step leaves it.
    fn admissible(&self, state: &State) -> bool {
        state.is_finite()
    }
}

/// Per-trajectory environment and vehicle parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelParams {
    /// Multiplier on the nominal air density.
    pub density_factor: f64,
    /// Wind along the heading, m/s (positive blows with the vehicle).
    pub wind_along: f64,
    /// Wind across the heading, m/s (positive blows toward +crossrange).
    pub wind_cross: f64,
    /// Mass in kg. `None` uses the model's dry mass.
    pub mass: Option<f64>,
    /// Multiplier on the drag coefficient.
    pub drag_scale: f64,
}

impl Default for ModelParams {
    fn default() -> Self {
        Self {
            density_factor: 1.0,
            wind_along: 0.0,
            wind_cross: 0.0,
            mass: None,
            drag_scale: 1.0,
        }
    }
}

// ---------------------------------------------------------------------------
// 3DOF point-mass ballistic re-entry model
// ---------------------------------------------------------------------------

/// Unpowered point-mass body with a pluggable drag law.
#[derive(Debug, Clone)]
pub struct BallisticModel<D = ConstantCd> {
    pub reference_area: f64, // m^2
    pub dry_mass: f64,       // kg
    pub drag: D,
}

impl BallisticModel<ConstantCd> {
    /// Model with the default constant Cd of 1.0.
    pub fn new(reference_area: f64, dry_mass: f64) -> Self {
        Self {
            reference_area,
            dry_mass,
            drag: ConstantCd::default(),
        }
    }
}

impl<D: DragCoefficient> BallisticModel<D> {
    /// Replace the drag law.
    pub fn with_drag<E: DragCoefficient>(self, drag: E) -> BallisticModel<E> {
        BallisticModel {
            reference_area: self.reference_area,
            dry_mass: self.dry_mass,
            drag,
        }
    }
}

impl<D: DragCoefficient> Dynamics for BallisticModel<D> {
    /// Finite, non-negative speed and a flight-path angle within ±90°.
    /// Past vertical the along-track drag term feeds energy back in.
    fn admissible(&self, state: &State) -> bool {
        state.is_finite()
            && state.velocity() >= 0.0
            && state.flight_path_angle().abs() <= FRAC_PI_2
    }

    /// Forces modeled:
    ///   1. Gravity - inverse-square, acting in the vertical plane
    ///   2. Drag    - quadratic in wind-relative speed, Mach-dependent Cd
    fn derivatives(&self, _t: f64, state: &State, params: &ModelParams) -> Deriv {
        let alt = state.altitude();
        let v = state.velocity();
        let gamma = state.flight_path_angle();
        let heading = state.heading();
        let mass = params.mass.unwrap_or(self.dry_mass).max(1.0);

        // --- Atmosphere and Mach ---
        let atm = atmosphere::at(alt, params.density_factor);
        let mach = v / atm.sound_speed;
        let cd = self.drag.cd(mach) * params.drag_scale;

        // --- Wind-relative velocity (trajectory frame) ---
        let v_horiz = v * gamma.cos();
        let v_vert = v * gamma.sin();
        let rel_along = v_horiz - params.wind_along;
        let rel_cross = -params.wind_cross;
        let rel_vert = v_vert;
        let v_rel = (rel_along * rel_along + rel_cross * rel_cross + rel_vert * rel_vert).sqrt();

        // --- Drag (acceleration) ---
        let q = 0.5 * atm.density * v_rel * v_rel;
        let drag_accel = q * cd * self.reference_area / mass;

        // drag_along decelerates, drag_cross pushes toward the relative crosswind
        let (drag_along, drag_cross) = if v_rel > MIN_RATE_SPEED {
            (drag_accel * rel_along / v_rel, -drag_accel * rel_cross / v_rel)
        } else {
            (0.0, 0.0)
        };

        // --- Gravity ---
        let g = gravity::gravity_accel(alt);

        let d_gamma = if v > MIN_RATE_SPEED {
            (-g * gamma.cos() + drag_cross * heading.sin()) / v
        } else {
            0.0
        };
        let d_heading = if v_horiz > MIN_RATE_SPEED {
            drag_cross / v_horiz
        } else {
            0.0
        };

        Deriv(Vector6::new(
            v_horiz * heading.cos(),
            v_horiz * heading.sin(),
            v_vert,
            -g * gamma.sin() - drag_along,
            d_gamma,
            d_heading,
        ))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
